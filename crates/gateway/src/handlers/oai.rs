//! OAI-PMH endpoint
//!
//! Every outcome is an OAI-PMH document, including arguments axum cannot
//! decode, so the extractors' rejections are handled here rather than
//! surfacing as plain-text responses.

use crate::middleware::rate_limit::{admit, retry_after_secs, ClientKey};
use crate::AppState;
use ajvs_common::{metrics::RequestMetrics, oai};
use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Form,
};
use chrono::Utc;
use std::collections::HashMap;

type Params = HashMap<String, String>;

/// `GET /oai?verb=...`
pub async fn harvest_get(
    State(state): State<AppState>,
    client: ClientKey,
    query: Result<Query<Params>, QueryRejection>,
) -> Response {
    let params = query.map(|Query(params)| params).map_err(|e| e.body_text());
    harvest(state, client, params).await
}

/// `POST /oai` with a form-encoded body
pub async fn harvest_post(
    State(state): State<AppState>,
    client: ClientKey,
    form: Result<Form<Params>, FormRejection>,
) -> Response {
    let params = form.map(|Form(params)| params).map_err(|e| e.body_text());
    harvest(state, client, params).await
}

async fn harvest(state: AppState, client: ClientKey, params: Result<Params, String>) -> Response {
    let request_metrics = RequestMetrics::start("oai");
    let now = Utc::now();

    let admission = admit(state.oai_limiter.as_ref(), &client, "oai");
    let response = match (admission.retry_after(), params) {
        (Some(_), _) => state.harvest.rate_limited(now),
        (None, Ok(params)) => state.harvest.handle(state.store.as_ref(), &params, now).await,
        (None, Err(rejection)) => {
            tracing::debug!(client = %client.as_str(), rejection = %rejection, "Undecodable OAI-PMH arguments");
            state.harvest.unreadable_arguments(now)
        }
    };

    request_metrics.finish(response.status.as_u16());

    let mut http = (
        response.status,
        [(header::CONTENT_TYPE, oai::CONTENT_TYPE)],
        response.body,
    )
        .into_response();

    if let Some(retry_after) = admission.retry_after() {
        http.headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
    }
    http
}
