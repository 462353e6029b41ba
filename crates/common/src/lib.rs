//! AJVS Common Library
//!
//! Shared code for the AJVS metadata export services including:
//! - Read-only catalog access (SeaORM models and the `ArticleStore` seam)
//! - OAI-PMH 2.0 request validation, dispatch and rendering
//! - RSS 2.0 feed rendering
//! - Fixed-window rate limiting
//! - XML writing with centralized escaping
//! - Error types, configuration, metrics

pub mod config;
pub mod db;
pub mod errors;
pub mod feed;
pub mod metrics;
pub mod oai;
pub mod rate_limit;
pub mod xml;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{ArticleRecord, ArticleStore, Repository};
pub use errors::{AppError, Result};
pub use feed::FeedRenderer;
pub use oai::{HarvestService, OaiResponse};
pub use rate_limit::{Admission, FixedWindowLimiter, RateLimitConfig};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
