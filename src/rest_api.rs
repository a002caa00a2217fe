//! REST API handlers for the EOL intelligence service's inbound HTTP
//! interface: `POST /eol`, `GET /stats`, `POST /cache/purge`,
//! `GET /session/communications`, plus an ambient `GET /health` liveness
//! convention.

use crate::App;
use crate::domain_types::{SoftwareName, SoftwareVersion};
use crate::orchestrator::LookupResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of `POST /eol`
#[derive(Debug, Clone, Deserialize)]
pub struct EolRequest {
    /// The software product name.
    pub software: String,
    /// An optional version string.
    pub version: Option<String>,
    /// An optional hint (`"os"` prepends the OS-family specialist).
    pub kind: Option<String>,
    /// When `true`, route straight to the generic fallback agent.
    #[serde(default)]
    pub internet_only: bool,
}

/// Generic error body returned for malformed requests, matching the
/// the rest of this service's error responses.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Short error summary.
    pub error: String,
    /// Optional detailed explanation.
    pub details: Option<String>,
}

impl ErrorResponse {
    fn bad_request(summary: &str, details: impl Into<String>) -> axum::response::Response {
        (
            StatusCode::BAD_REQUEST,
            Json(Self {
                error: summary.to_string(),
                details: Some(details.into()),
            }),
        )
            .into_response()
    }
}

/// `POST /eol`: resolve one software/version query through the orchestrator.
///
/// Malformed input is `400`; every other outcome — including a
/// candidate-exhaustion miss — is `200` with `success=false` in the body.
/// `500` is reserved for unhandled internal errors, none of which this
/// handler itself can raise (the orchestrator never returns `Err`).
pub async fn eol_lookup(State(app): State<Arc<App>>, Json(request): Json<EolRequest>) -> axum::response::Response {
    let software = match SoftwareName::try_new(request.software) {
        Ok(software) => software,
        Err(e) => return ErrorResponse::bad_request("invalid software name", e.to_string()),
    };

    let version = match request.version {
        Some(v) => match SoftwareVersion::try_new(v) {
            Ok(version) => Some(version),
            Err(e) => return ErrorResponse::bad_request("invalid version", e.to_string()),
        },
        None => None,
    };

    let response: LookupResponse = app
        .orchestrator
        .lookup(&software, version.as_ref(), request.kind.as_deref(), request.internet_only)
        .await;

    (StatusCode::OK, Json(response)).into_response()
}

/// `GET /stats`: telemetry and cache snapshots
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Per-agent and global request telemetry.
    pub telemetry: crate::telemetry::TelemetrySnapshot,
    /// Aggregate cache counters.
    pub cache: crate::cache::CacheStats,
}

/// `GET /stats` handler.
pub async fn stats(State(app): State<Arc<App>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        telemetry: app.telemetry.snapshot(),
        cache: app.cache.stats().await,
    })
}

/// Body of `POST /cache/purge`
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PurgeRequest {
    /// Restrict the purge to this software name, when set.
    pub software: Option<String>,
    /// Restrict the purge to this agent name, when set.
    pub agent: Option<String>,
}

/// Response of `POST /cache/purge`.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    /// Rows removed.
    pub deleted_count: u64,
}

/// `POST /cache/purge` handler.
pub async fn purge_cache(State(app): State<Arc<App>>, Json(request): Json<PurgeRequest>) -> axum::response::Response {
    let software = match request.software.map(SoftwareName::try_new) {
        Some(Ok(software)) => Some(software),
        Some(Err(e)) => return ErrorResponse::bad_request("invalid software name", e.to_string()),
        None => None,
    };

    let deleted_count = if let Some(agent) = &request.agent {
        app.cache.purge(software.as_ref().map(SoftwareName::as_ref), Some(agent.as_str())).await
    } else {
        app.cache.purge(software.as_ref().map(SoftwareName::as_ref), None).await
    };

    (StatusCode::OK, Json(PurgeResponse { deleted_count })).into_response()
}

/// `GET /session/communications`: the current session's communication log,
/// for the operator UI
pub async fn session_communications(
    State(app): State<Arc<App>>,
) -> Json<Vec<crate::orchestrator::communication_log::CommunicationEntry>> {
    Json(app.orchestrator.communications())
}

/// `DELETE /session/communications`: reset the session's log and decision
/// cache `clear_communications` operation.
pub async fn clear_session_communications(
    State(app): State<Arc<App>>,
) -> Json<crate::orchestrator::ClearCommunicationsResult> {
    Json(app.orchestrator.clear_communications())
}

/// `GET /health`: liveness probe.
pub async fn health(State(app): State<Arc<App>>) -> Json<crate::orchestrator::HealthSnapshot> {
    Json(app.orchestrator.health())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eol_request_deserializes_with_defaults() {
        let request: EolRequest = serde_json::from_str(r#"{"software":"Ubuntu"}"#).unwrap();
        assert_eq!(request.software, "Ubuntu");
        assert!(request.version.is_none());
        assert!(!request.internet_only);
    }
}
