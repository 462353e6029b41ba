//! Prometheus metrics for the export endpoints
//!
//! Everything goes through the `metrics` facade; the gateway installs the
//! Prometheus recorder. Without a recorder every helper is a no-op, which
//! is what unit tests rely on.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Prefix shared by every metric name below
pub const METRICS_PREFIX: &str = "ajvs";

pub const REQUESTS_TOTAL: &str = "ajvs_requests_total";
pub const REQUEST_DURATION: &str = "ajvs_request_duration_seconds";
pub const OAI_REQUESTS_TOTAL: &str = "ajvs_oai_requests_total";
pub const OAI_ERRORS_TOTAL: &str = "ajvs_oai_errors_total";
pub const FEED_ITEMS: &str = "ajvs_feed_items_rendered";
pub const RATE_LIMITED_TOTAL: &str = "ajvs_rate_limited_total";
pub const STORE_QUERY_DURATION: &str = "ajvs_store_query_duration_seconds";
pub const STORE_QUERY_TIMEOUTS: &str = "ajvs_store_query_timeouts_total";

/// Histogram buckets in seconds, shared by request and store latency.
/// 5s is the default store deadline.
pub const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Describe every metric once at startup
pub fn register_metrics() {
    for (name, help) in [
        (REQUESTS_TOTAL, "HTTP requests by endpoint and status"),
        (OAI_REQUESTS_TOTAL, "OAI-PMH requests by verb"),
        (OAI_ERRORS_TOTAL, "OAI-PMH error documents by error code"),
        (RATE_LIMITED_TOTAL, "Requests rejected by the rate limiter"),
        (STORE_QUERY_TIMEOUTS, "Catalog queries abandoned after the deadline"),
    ] {
        describe_counter!(name, Unit::Count, help);
    }

    describe_histogram!(REQUEST_DURATION, Unit::Seconds, "HTTP request latency");
    describe_histogram!(STORE_QUERY_DURATION, Unit::Seconds, "Catalog query latency");
    describe_gauge!(FEED_ITEMS, Unit::Count, "Items in the most recently rendered RSS feed");

    tracing::info!(prefix = METRICS_PREFIX, "Metrics registered");
}

/// Times one HTTP request; call `finish` with the final status
pub struct RequestMetrics {
    start: Instant,
    endpoint: &'static str,
}

impl RequestMetrics {
    pub fn start(endpoint: &'static str) -> Self {
        Self {
            start: Instant::now(),
            endpoint,
        }
    }

    pub fn finish(self, status: u16) {
        let elapsed = self.start.elapsed().as_secs_f64();
        counter!(REQUESTS_TOTAL, "endpoint" => self.endpoint, "status" => status.to_string()).increment(1);
        histogram!(REQUEST_DURATION, "endpoint" => self.endpoint).record(elapsed);
    }
}

pub fn record_oai_verb(verb: &'static str) {
    counter!(OAI_REQUESTS_TOTAL, "verb" => verb).increment(1);
}

pub fn record_oai_error(code: &'static str) {
    counter!(OAI_ERRORS_TOTAL, "code" => code).increment(1);
}

pub fn record_rate_limited(endpoint: &'static str) {
    counter!(RATE_LIMITED_TOTAL, "endpoint" => endpoint).increment(1);
}

pub fn record_feed_items(count: usize) {
    gauge!(FEED_ITEMS).set(count as f64);
}

/// Latency of one store query; `completed` is false when the deadline fired
pub fn record_store_query(query: &str, duration_secs: f64, completed: bool) {
    histogram!(STORE_QUERY_DURATION, "query" => query.to_string()).record(duration_secs);
    if !completed {
        counter!(STORE_QUERY_TIMEOUTS, "query" => query.to_string()).increment(1);
    }
}
