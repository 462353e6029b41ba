//! End-to-end tests driving the router with an in-memory catalog

use ajvs_common::config::AppConfig;
use ajvs_common::db::fixtures::{article, article_id, hostile_article};
use ajvs_common::db::{ArticleStore, MemoryStore, StoreBehavior};
use ajvs_gateway::{create_router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(config: AppConfig, store: Arc<MemoryStore>) -> Router {
    let store: Arc<dyn ArticleStore> = store;
    create_router(AppState::new(config, store).unwrap())
}

fn app(store: Arc<MemoryStore>) -> Router {
    app_with(AppConfig::default(), store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

fn oai_error_code(body: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(body).expect("well-formed XML");
    doc.descendants()
        .find(|n| n.has_tag_name("error"))
        .and_then(|n| n.attribute("code"))
        .map(str::to_string)
}

#[tokio::test]
async fn test_identify_over_get() {
    let app = app(Arc::new(MemoryStore::default()));
    let (status, headers, body) = send(&app, get("/oai?verb=Identify")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/xml; charset=utf-8");
    assert!(headers.contains_key("x-request-id"));

    let doc = roxmltree::Document::parse(&body).unwrap();
    let name = doc.descendants().find(|n| n.has_tag_name("repositoryName")).unwrap();
    assert_eq!(name.text(), Some("African Journal of Veterinary Sciences"));
    let sample = doc.descendants().find(|n| n.has_tag_name("sampleIdentifier")).unwrap();
    assert_eq!(sample.text(), Some("oai:ajvs.org:article/123e4567-e89b-12d3-a456-426614174000"));
}

#[tokio::test]
async fn test_get_record_over_post() {
    let store = Arc::new(MemoryStore::new(vec![article(1, 0)]));
    let app = app(store.clone());

    let form = format!(
        "verb=GetRecord&metadataPrefix=oai_dc&identifier=oai%3Aajvs.org%3Aarticle%2F{}",
        article_id(1)
    );
    let request = Request::builder()
        .method("POST")
        .uri("/oai")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();

    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(oai_error_code(&body), None);
    assert!(body.contains("<dc:identifier>https://doi.org/10.1234/x</dc:identifier>"));
    assert_eq!(store.calls(), 1);
}

#[tokio::test]
async fn test_oai_status_codes() {
    let store = Arc::new(MemoryStore::new(vec![article(1, 0)]));
    let app = app(store.clone());

    let (status, _, body) = send(&app, get("/oai")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(oai_error_code(&body).as_deref(), Some("badArgument"));

    let (status, _, body) = send(&app, get("/oai?verb=ListSets")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(oai_error_code(&body).as_deref(), Some("badVerb"));

    let (status, _, body) = send(
        &app,
        get("/oai?verb=GetRecord&identifier=oai:ajvs.org:article/0b6f8a52-7c1e-4d0a-9f3b-ffffffffffff"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(oai_error_code(&body).as_deref(), Some("idDoesNotExist"));

    store.set_behavior(StoreBehavior::Fail);
    let (status, _, body) = send(&app, get("/oai?verb=ListIdentifiers")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(oai_error_code(&body).as_deref(), Some("badRequest"));
}

#[tokio::test]
async fn test_rss_headers_and_items() {
    let store = Arc::new(MemoryStore::new((0..60).map(|n| article(n, n as i64)).collect()));
    let app = app(store);

    for uri in ["/rss", "/rss.xml"] {
        let (status, headers, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "application/rss+xml; charset=utf-8");
        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=3600");

        let doc = roxmltree::Document::parse(&body).unwrap();
        assert_eq!(doc.descendants().filter(|n| n.has_tag_name("item")).count(), 50);
    }
}

#[tokio::test]
async fn test_rss_store_failure_is_json_500() {
    let store = Arc::new(MemoryStore::new(vec![article(1, 0)]));
    store.set_behavior(StoreBehavior::Fail);
    let app = app(store);

    let (status, headers, body) = send(&app, get("/rss")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(headers[header::CONTENT_TYPE].to_str().unwrap().starts_with("application/json"));

    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"]["message"], "Internal server error");
    assert!(!body.contains("connection refused"));
}

#[tokio::test]
async fn test_escaping_matches_across_endpoints() {
    let hostile = hostile_article(1, 0);
    let store = Arc::new(MemoryStore::new(vec![hostile.clone()]));
    let app = app(store);
    let escaped_title = "Ticks &amp; &lt;b&gt;lice&lt;/b&gt; in &quot;free-range&quot; goats: O&apos;Neill&apos;s survey";

    let (_, _, oai) = send(&app, get("/oai?verb=ListRecords")).await;
    let (_, _, rss) = send(&app, get("/rss")).await;

    for body in [&oai, &rss] {
        assert!(body.contains(escaped_title));
        let doc = roxmltree::Document::parse(body).unwrap();
        assert!(doc
            .descendants()
            .any(|n| n.has_tag_name("title") && n.text() == Some(hostile.manuscript.title.as_str())));
    }
}

fn limited_config(max_requests: u32, shared_quota: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.rate_limit.max_requests = max_requests;
    config.rate_limit.shared_quota = shared_quota;
    config
}

#[tokio::test]
async fn test_oai_rate_limit() {
    let store = Arc::new(MemoryStore::new(vec![article(1, 0)]));
    let app = app_with(limited_config(3, false), store.clone());

    for _ in 0..3 {
        let (status, _, _) = send(&app, get("/oai?verb=ListRecords")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, headers, body) = send(&app, get("/oai?verb=ListRecords")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::CONTENT_TYPE], "text/xml; charset=utf-8");
    assert!(body.contains("Rate limit exceeded"));
    assert!(oai_error_code(&body).is_some());
    assert_eq!(store.calls(), 3);

    let retry_after: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!((1..=3600).contains(&retry_after));

    // Another client has its own window
    let other = Request::builder()
        .uri("/oai?verb=Identify")
        .header("x-forwarded-for", "198.51.100.4")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, other).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rss_rate_limit_is_json() {
    let app = app_with(limited_config(1, false), Arc::new(MemoryStore::new(vec![article(1, 0)])));

    let (status, _, _) = send(&app, get("/rss")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, headers, body) = send(&app, get("/rss")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["error"]["code"], "RATE_LIMITED");

    // Time left in the window, not the window length
    let retry_after: u64 = headers[header::RETRY_AFTER].to_str().unwrap().parse().unwrap();
    assert!((1..=3600).contains(&retry_after));
}

fn untyped_post(body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/oai")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_post_without_form_content_type_is_bad_argument() {
    let store = Arc::new(MemoryStore::new(vec![article(1, 0)]));
    let app = app(store.clone());

    let (status, headers, body) = send(&app, untyped_post("verb=Identify")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(headers[header::CONTENT_TYPE], "text/xml; charset=utf-8");
    assert_eq!(oai_error_code(&body).as_deref(), Some("badArgument"));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_undecodable_posts_count_against_the_limit() {
    let app = app_with(limited_config(2, false), Arc::new(MemoryStore::default()));

    for _ in 0..2 {
        let (status, _, _) = send(&app, untyped_post("verb=Identify")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _, body) = send(&app, get("/oai?verb=Identify")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(oai_error_code(&body).is_some());
}

#[tokio::test]
async fn test_quota_sharing() {
    let store = Arc::new(MemoryStore::new(vec![article(1, 0)]));

    let independent = app_with(limited_config(1, false), store.clone());
    send(&independent, get("/oai?verb=Identify")).await;
    let (status, _, _) = send(&independent, get("/rss")).await;
    assert_eq!(status, StatusCode::OK);

    let shared = app_with(limited_config(1, true), store);
    send(&shared, get("/oai?verb=Identify")).await;
    let (status, _, _) = send(&shared, get("/rss")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_health_and_ready() {
    let store = Arc::new(MemoryStore::default());
    let app = app(store.clone());

    let (status, _, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("healthy"));

    let (status, _, body) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"ready\""));

    store.set_behavior(StoreBehavior::Fail);
    let (status, _, body) = send(&app, get("/ready")).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body.contains("not_ready"));
}
