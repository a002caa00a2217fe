//! Black-box integration tests for the `/eol` and `/health` endpoints,
//! exercising the real `App` wiring through the HTTP router rather than
//! calling the orchestrator directly, driven via `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use eol_sentinel::{App, AppConfig};
use std::sync::Arc;
use tower::ServiceExt;

async fn test_app() -> Arc<App> {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = AppConfig::default();
    config.cache_db_path = dir.path().join("eol_cache.db");
    std::mem::forget(dir);
    Arc::new(App::new(config).await.expect("app wiring never fails"))
}

#[tokio::test]
async fn ubuntu_2004_resolves_to_its_documented_eol_date() {
    let app = test_app().await;
    let router = eol_sentinel::server::create_router(app);

    let request = Request::builder()
        .uri("/eol")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"software":"Ubuntu","version":"20.04"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(body["success"], serde_json::json!(true));
    assert_eq!(body["agent_used"], serde_json::json!("ubuntu"));
    assert_eq!(body["data"]["eol_date"], serde_json::json!("2030-04-23T00:00:00Z"));
}

#[tokio::test]
async fn windows_server_2012_r2_resolves_to_its_documented_eol_date() {
    let app = test_app().await;
    let router = eol_sentinel::server::create_router(app);

    let request = Request::builder()
        .uri("/eol")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"software":"Windows Server","version":"2012 R2"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(body["success"], serde_json::json!(true));
    assert_eq!(body["agent_used"], serde_json::json!("microsoft"));
    assert_eq!(body["data"]["eol_date"], serde_json::json!("2023-10-10T00:00:00Z"));
}

#[tokio::test]
async fn unrecognised_software_exhausts_candidates_without_a_server_error() {
    let app = test_app().await;
    let router = eol_sentinel::server::create_router(app);

    let request = Request::builder()
        .uri("/eol")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"software":"completely-unknown-product-xyz"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["success"], serde_json::json!(false));
}

#[tokio::test]
async fn health_endpoint_reports_cache_and_agent_status() {
    let app = test_app().await;
    let router = eol_sentinel::server::create_router(app);

    let request = Request::builder().uri("/health").method("GET").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["status"], serde_json::json!("ok"));
    assert_eq!(body["cache_available"], serde_json::json!(true));
}
