//! HTTP router assembly for `eol-sentineld`'s inbound API.
//!
//! This module wires routes and middleware around the handlers `rest_api`
//! defines, and owns the `serve`/graceful-shutdown helpers every binary
//! and test calls into.

use crate::App;
use crate::rest_api::{clear_session_communications, eol_lookup, health, purge_cache, session_communications, stats};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Outer request timeout applied ahead of the orchestrator's own per-call
/// timeouts, so a caller always gets a bounded response even if an agent
/// misbehaves.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Build the Axum router for every HTTP endpoint this service exposes,
/// with the shared `App` as Axum state.
#[must_use]
pub fn create_router(app: Arc<App>) -> Router {
    Router::new()
        .route("/eol", post(eol_lookup))
        .route("/stats", get(stats))
        .route("/cache/purge", post(purge_cache))
        .route("/session/communications", get(session_communications).delete(clear_session_communications))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .with_state(app)
}

/// Start the server on the given listener, serving until the future
/// resolves or the process is interrupted.
///
/// # Errors
///
/// Returns an error if the underlying `hyper` server fails.
pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

/// Serve with graceful shutdown on Ctrl-C: in-flight requests are allowed
/// to finish, but no new connections are accepted once the signal fires.
///
/// # Errors
///
/// Returns an error if the underlying `hyper` server fails.
pub async fn serve_with_graceful_shutdown(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;
    use std::net::SocketAddr;
    use tokio::time::{Duration as TokioDuration, timeout};

    async fn test_app() -> Arc<App> {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();
        config.cache_db_path = dir.path().join("eol_cache.db");
        // Leak the tempdir for the lifetime of the test process so the
        // SQLite file isn't removed out from under the pool mid-test.
        std::mem::forget(dir);
        Arc::new(App::new(config).await.expect("app wiring never fails"))
    }

    async fn bind_ephemeral() -> (TcpListener, SocketAddr) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        (listener, addr)
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = test_app().await;
        let router = create_router(app);
        let (listener, addr) = bind_ephemeral().await;
        let handle = tokio::spawn(serve(listener, router));

        let client = reqwest::Client::new();
        let response = timeout(TokioDuration::from_secs(5), client.get(format!("http://{addr}/health")).send())
            .await
            .expect("request did not time out")
            .expect("request succeeded");

        assert!(response.status().is_success());
        handle.abort();
    }

    #[tokio::test]
    async fn eol_endpoint_resolves_a_known_static_cycle() {
        let app = test_app().await;
        let router = create_router(app);
        let (listener, addr) = bind_ephemeral().await;
        let handle = tokio::spawn(serve(listener, router));

        let client = reqwest::Client::new();
        let response = timeout(
            TokioDuration::from_secs(5),
            client
                .post(format!("http://{addr}/eol"))
                .json(&serde_json::json!({"software": "Ubuntu", "version": "20.04"}))
                .send(),
        )
        .await
        .expect("request did not time out")
        .expect("request succeeded");

        assert!(response.status().is_success());
        let body: serde_json::Value = response.json().await.expect("valid json body");
        assert_eq!(body["success"], serde_json::json!(true));
        assert_eq!(body["agent_used"], serde_json::json!("ubuntu"));

        handle.abort();
    }

    #[tokio::test]
    async fn malformed_eol_request_is_rejected_with_bad_request() {
        let app = test_app().await;
        let router = create_router(app);
        let (listener, addr) = bind_ephemeral().await;
        let handle = tokio::spawn(serve(listener, router));

        let client = reqwest::Client::new();
        let response = timeout(
            TokioDuration::from_secs(5),
            client
                .post(format!("http://{addr}/eol"))
                .json(&serde_json::json!({"software": ""}))
                .send(),
        )
        .await
        .expect("request did not time out")
        .expect("request succeeded");

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        handle.abort();
    }
}
