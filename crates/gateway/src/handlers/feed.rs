//! RSS feed endpoint
//!
//! The feed has no in-band error convention, so rate limiting and store
//! failures use the JSON error body of `AppError`.

use crate::middleware::rate_limit::{admit, retry_after_secs, ClientKey};
use crate::AppState;
use ajvs_common::{
    errors::{AppError, Result},
    feed,
    metrics::RequestMetrics,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;

/// `GET /rss`
pub async fn rss(State(state): State<AppState>, client: ClientKey) -> Result<Response> {
    let request_metrics = RequestMetrics::start("rss");
    let result = render(&state, &client).await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status_code(),
    };
    request_metrics.finish(status.as_u16());

    result
}

async fn render(state: &AppState, client: &ClientKey) -> Result<Response> {
    if let Some(retry_after) = admit(state.feed_limiter.as_ref(), client, "rss").retry_after() {
        let limits = &state.config.rate_limit;
        return Err(AppError::RateLimited {
            limit: limits.max_requests,
            window_secs: limits.window_secs,
            retry_after_secs: retry_after_secs(retry_after),
        });
    }

    let body = state.feed.latest(state.store.as_ref(), Utc::now()).await?;

    Ok((
        [
            (header::CONTENT_TYPE, feed::CONTENT_TYPE.to_string()),
            (header::CACHE_CONTROL, state.feed.cache_control()),
        ],
        body,
    )
        .into_response())
}
