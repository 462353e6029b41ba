//! Database layer for the export services
//!
//! Provides:
//! - SeaORM entity models
//! - The read-only `ArticleStore` interface and its projections
//! - A SeaORM-backed `Repository`
//! - Connection pool management and query timeouts

#[cfg(any(test, feature = "test-helpers"))]
pub mod fixtures;
pub mod models;
mod repository;
mod store;

pub use repository::Repository;
pub use store::{ArticleIdentifier, ArticleRecord, ArticleStore, AuthorInfo, IssueInfo, ManuscriptInfo};

#[cfg(any(test, feature = "test-helpers"))]
pub use store::{MemoryStore, StoreBehavior};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::metrics;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::info;

/// Pooled read-only connection to the catalog
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Connect using the `database` section
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!(max_connections = config.max_connections, "Connecting to catalog database");

        let mut opts = ConnectOptions::new(&config.url);
        opts
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e)
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the connection for reads
    pub fn read(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// `SELECT 1` round trip
    pub async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;

        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}

/// Run a store query under a deadline.
///
/// Elapsed deadlines become `AppError::StoreTimeout` so handlers can render
/// a terminal error instead of hanging the client.
pub async fn with_query_timeout<T, F>(query: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let start = Instant::now();
    let outcome = tokio::time::timeout(timeout, fut).await;
    metrics::record_store_query(query, start.elapsed().as_secs_f64(), outcome.is_ok());

    match outcome {
        Ok(result) => result,
        Err(_) => Err(AppError::StoreTimeout {
            query: query.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_query_timeout_passes_result_through() {
        let value = with_query_timeout("probe", Duration::from_secs(1), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_with_query_timeout_maps_elapsed_deadline() {
        let result: Result<()> = with_query_timeout("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(AppError::StoreTimeout { query, timeout_ms }) => {
                assert_eq!(query, "slow");
                assert_eq!(timeout_ms, 10);
            }
            other => panic!("expected timeout, got {:?}", other.map(|_| ())),
        }
    }
}
