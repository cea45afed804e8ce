//! Health check handlers for liveness and readiness checks.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Health status response for liveness and readiness checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Status indicator: "ok" or "not_ready: <reason>".
    pub status: String,

    pub service: String,

    pub version: String,

    /// Identifier of this running instance.
    pub instance_id: String,

    /// RFC 3339 start time of this instance.
    pub started_at: String,

    /// Number of registered badge renderers (readiness only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renderers: Option<usize>,
}

impl HealthStatus {
    pub fn alive(state: &AppState) -> Self {
        Self {
            status: "ok".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            instance_id: state.instance().id.clone(),
            started_at: state.started_at().to_rfc3339(),
            renderers: None,
        }
    }

    pub fn ready(state: &AppState, renderers: usize) -> Self {
        Self {
            renderers: Some(renderers),
            ..Self::alive(state)
        }
    }

    pub fn not_ready(state: &AppState, reason: &str) -> Self {
        Self {
            status: format!("not_ready: {}", reason),
            ..Self::alive(state)
        }
    }
}

/// Liveness check handler.
///
/// ```text
/// GET /health/live
/// {"status":"ok","service":"badgeserve-service-shared","version":"0.1.0","instance_id":"...","started_at":"..."}
/// ```
pub async fn health_live(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(HealthStatus::alive(&state)))
}

/// Readiness check handler. Not ready while no renderer is registered.
pub async fn health_ready(State(state): State<AppState>) -> Response {
    let renderers = state.dispatcher().registry().len();

    if renderers == 0 {
        let status = HealthStatus::not_ready(&state, "no renderers registered");
        return (StatusCode::SERVICE_UNAVAILABLE, Json(status)).into_response();
    }

    (StatusCode::OK, Json(HealthStatus::ready(&state, renderers))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_state;

    #[test]
    fn test_health_status_alive() {
        let state = test_state();
        let status = HealthStatus::alive(&state);
        assert_eq!(status.status, "ok");
        assert_eq!(status.instance_id, state.instance().id);
        assert!(status.renderers.is_none());
    }

    #[test]
    fn test_health_status_ready() {
        let status = HealthStatus::ready(&test_state(), 2);
        assert_eq!(status.status, "ok");
        assert_eq!(status.renderers, Some(2));
    }

    #[test]
    fn test_health_status_not_ready() {
        let status = HealthStatus::not_ready(&test_state(), "no data");
        assert!(status.status.starts_with("not_ready:"));
        assert!(status.status.contains("no data"));
    }

    #[test]
    fn test_health_status_serialization() {
        let status = HealthStatus::alive(&test_state());
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"instance_id\":\"test-instance\""));
        assert!(!json.contains("renderers"));
    }
}
