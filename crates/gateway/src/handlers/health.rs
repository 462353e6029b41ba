//! Liveness and readiness probes

use crate::AppState;
use ajvs_common::db::with_query_timeout;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::time::Instant;

#[derive(Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub store: StoreProbe,
}

/// Outcome of pinging the catalog store
#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum StoreProbe {
    Up { latency_ms: u64 },
    Down { error: String },
}

/// Always 200 while the process is serving
pub async fn health() -> Json<Liveness> {
    Json(Liveness {
        status: "healthy",
        version: ajvs_common::VERSION,
    })
}

/// 200 when the store answers a ping within the query deadline, else 503
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let start = Instant::now();

    match with_query_timeout("ping", state.config.query_timeout(), state.store.ping()).await {
        Ok(()) => (
            StatusCode::OK,
            Json(Readiness {
                status: "ready",
                store: StoreProbe::Up {
                    latency_ms: start.elapsed().as_millis() as u64,
                },
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Catalog store not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "not_ready",
                    store: StoreProbe::Down {
                        error: format!("{:?}", e.code()),
                    },
                }),
            )
        }
    }
}
