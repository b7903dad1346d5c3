//! Integration tests for the dashboard API.
//!
//! Each test runs a weekly pass against the in-memory mock source, then boots
//! the full Axum router (same assembly as `main.rs`) and drives it with
//! `tower::ServiceExt::oneshot`. No live server or Reddit access needed.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use community_health_bot::{
    analytics::HistoryEntry,
    api,
    config::CommunityConfig,
    db,
    logging::TracingSink,
    metrics::RunMetrics,
    repository::HistoryRepository,
    runner::Runner,
    services::mock_source::MockPostSource,
};

// ---- Helpers ----------------------------------------------------------------

/// Build the complete test router after two weekly runs for `r/rust` and
/// one for `r/golang`.
async fn build_test_app() -> Router {
    let pool = db::create_pool("sqlite::memory:").await.unwrap();
    let repository = HistoryRepository::new(pool);
    let metrics = Arc::new(RunMetrics::new().unwrap());

    let first_run = Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap();
    let second_run = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();

    for (now, names) in [(first_run, vec!["r/rust", "r/golang"]), (second_run, vec!["r/rust"])] {
        let source = MockPostSource::demo("rust", now);
        let sink = (TracingSink, metrics.clone());
        let plans: Vec<CommunityConfig> = names
            .into_iter()
            .map(|name| CommunityConfig::with_defaults(name, 5))
            .collect();
        Runner::new(&source, &sink, &repository)
            .with_metrics(&metrics)
            .run_communities(&plans, now)
            .await;
    }

    api::create_router(repository, metrics)
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Convenience: collect body bytes and parse as JSON.
async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---- GET /health ------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_with_ok_body() {
    let resp = get(build_test_app().await, "/health").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}

// ---- GET /reports/latest ----------------------------------------------------

#[tokio::test]
async fn latest_report_returns_most_recent_run() {
    let resp = get(build_test_app().await, "/reports/latest?community=r/rust").await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().contains_key(header::ETAG));
    assert_eq!(resp.headers()[header::LAST_MODIFIED], "Fri, 15 Mar 2024 12:00:00 GMT");

    let json = json_body(resp.into_body()).await;
    assert_eq!(json["community"], "r/rust");
    assert_eq!(json["report"]["generated_at"], "2024-03-15T12:00:00Z");
    assert!(json["report"]["metrics"]["total_posts"].as_u64().unwrap() > 0);
    assert_eq!(json["report"]["history"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn latest_report_unknown_community_returns_404() {
    let resp = get(build_test_app().await, "/reports/latest?community=r/python").await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let json = json_body(resp.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("r/python"));
}

#[tokio::test]
async fn latest_report_without_community_returns_400() {
    let resp = get(build_test_app().await, "/reports/latest").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn latest_report_honours_if_none_match() {
    let app = build_test_app().await;
    let first = get(app.clone(), "/reports/latest?community=r/rust").await;
    let etag = first.headers()[header::ETAG].to_str().unwrap().to_string();

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/reports/latest?community=r/rust")
                .header(header::IF_NONE_MATCH, etag)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_MODIFIED);
}

// ---- GET /history -----------------------------------------------------------

#[tokio::test]
async fn history_for_community_is_newest_first() {
    let resp = get(build_test_app().await, "/history?community=r/rust").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let json = json_body(resp.into_body()).await;
    let entries = json["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["date"], "2024-03-15");
    assert_eq!(entries[1]["date"], "2024-03-08");
}

#[tokio::test]
async fn history_limit_is_clamped() {
    let app = build_test_app().await;

    let zero = json_body(get(app.clone(), "/history?limit=0").await.into_body()).await;
    assert_eq!(zero["limit"], 1);
    assert_eq!(zero["entries"].as_array().unwrap().len(), 1);

    let huge = json_body(get(app, "/history?limit=1000").await.into_body()).await;
    assert_eq!(huge["limit"], 52);
    assert_eq!(huge["entries"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn history_across_communities_is_sorted_by_date() {
    let repository = HistoryRepository::new(db::create_pool("sqlite::memory:").await.unwrap());
    for (day, community) in [(15, "r/rust"), (1, "r/golang"), (8, "r/rust")] {
        repository
            .append_history(&HistoryEntry {
                date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                community: community.to_string(),
                total_posts: 10,
                unanswered: 1,
                unanswered_rate: 0.1,
                median_latency_minutes: None,
            })
            .await
            .unwrap();
    }
    let app = api::create_router(repository, Arc::new(RunMetrics::new().unwrap()));

    let json = json_body(get(app, "/history").await.into_body()).await;

    let dates: Vec<&str> = json["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates, vec!["2024-03-15", "2024-03-08", "2024-03-01"]);
}

#[tokio::test]
async fn history_for_unknown_community_is_empty() {
    let json = json_body(get(build_test_app().await, "/history?community=r/python").await.into_body()).await;
    assert!(json["entries"].as_array().unwrap().is_empty());
}

// ---- GET /communities -------------------------------------------------------

#[tokio::test]
async fn communities_lists_reported_names() {
    let json = json_body(get(build_test_app().await, "/communities").await.into_body()).await;
    assert_eq!(json["communities"], serde_json::json!(["r/golang", "r/rust"]));
}

// ---- GET /metrics -----------------------------------------------------------

#[tokio::test]
async fn metrics_content_type_is_prometheus_text() {
    let resp = get(build_test_app().await, "/metrics").await;

    assert_eq!(resp.status(), StatusCode::OK);
    let ct = resp.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
    assert_eq!(ct, "text/plain; version=0.0.4");
}

#[tokio::test]
async fn metrics_body_reflects_the_runs() {
    let resp = get(build_test_app().await, "/metrics").await;
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = String::from_utf8(bytes.to_vec()).unwrap();

    assert!(body.contains("community_health_bot_communities_total 3"));
    assert!(body.contains("community_health_bot_records_scanned_total"));
    assert!(body.contains("community_health_bot_weekly_posts{community=\"r/rust\"}"));
}

// ---- CORS -------------------------------------------------------------------

#[tokio::test]
async fn cors_allows_any_origin() {
    let resp = build_test_app()
        .await
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "https://dashboard.example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}
