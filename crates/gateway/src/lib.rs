//! AJVS Metadata Export Gateway
//!
//! HTTP surface for the bibliographic export services:
//! - `GET|POST /oai` - OAI-PMH 2.0 repository
//! - `GET /rss` - RSS 2.0 feed of recent articles
//! - `/health`, `/ready` - probes

pub mod handlers;
pub mod middleware;

use ajvs_common::{
    config::{AppConfig, RateLimitSettings},
    db::ArticleStore,
    errors::Result,
    feed::FeedRenderer,
    oai::HarvestService,
    rate_limit::{FixedWindowLimiter, RateLimitConfig},
};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Services, store handle and limiters cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn ArticleStore>,
    pub harvest: Arc<HarvestService>,
    pub feed: Arc<FeedRenderer>,
    /// `None` when rate limiting is disabled
    pub oai_limiter: Option<Arc<FixedWindowLimiter>>,
    pub feed_limiter: Option<Arc<FixedWindowLimiter>>,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn ArticleStore>) -> Result<Self> {
        let harvest = HarvestService::new(&config)?;
        let feed = FeedRenderer::new(&config);
        let (oai_limiter, feed_limiter) = build_limiters(&config.rate_limit);

        Ok(Self {
            config: Arc::new(config),
            store,
            harvest: Arc::new(harvest),
            feed: Arc::new(feed),
            oai_limiter,
            feed_limiter,
        })
    }
}

/// One limiter per endpoint, or a single one behind both with `shared_quota`
fn build_limiters(
    settings: &RateLimitSettings,
) -> (Option<Arc<FixedWindowLimiter>>, Option<Arc<FixedWindowLimiter>>) {
    if !settings.enabled {
        info!("Rate limiting disabled");
        return (None, None);
    }

    let limits = RateLimitConfig::from(settings);
    let oai = Arc::new(FixedWindowLimiter::new(limits));
    let feed = if settings.shared_quota {
        oai.clone()
    } else {
        Arc::new(FixedWindowLimiter::new(limits))
    };

    info!(
        max_requests = limits.max_requests,
        window_secs = limits.window.as_secs(),
        shared = settings.shared_quota,
        "Rate limiting enabled"
    );

    (Some(oai), Some(feed))
}

/// Routes for both export endpoints plus probes, with the HTTP layer stack
pub fn create_router(state: AppState) -> Router {
    // Harvesters and feed readers are cross-origin clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // x-request-id in, echoed out
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    let timeout = TimeoutLayer::new(state.config.request_timeout());

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // OAI-PMH
        .route("/oai", get(handlers::oai::harvest_get).post(handlers::oai::harvest_post))

        // RSS
        .route("/rss", get(handlers::feed::rss))
        .route("/rss.xml", get(handlers::feed::rss))

        .layer(timeout)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiters_independent_by_default() {
        let (oai, feed) = build_limiters(&RateLimitSettings::default());
        let (oai, feed) = (oai.unwrap(), feed.unwrap());
        assert!(!Arc::ptr_eq(&oai, &feed));
    }

    #[test]
    fn test_shared_quota_uses_one_limiter() {
        let settings = RateLimitSettings {
            shared_quota: true,
            ..RateLimitSettings::default()
        };
        let (oai, feed) = build_limiters(&settings);
        assert!(Arc::ptr_eq(&oai.unwrap(), &feed.unwrap()));
    }

    #[test]
    fn test_disabled_limiting() {
        let settings = RateLimitSettings {
            enabled: false,
            ..RateLimitSettings::default()
        };
        let (oai, feed) = build_limiters(&settings);
        assert!(oai.is_none() && feed.is_none());
    }
}
