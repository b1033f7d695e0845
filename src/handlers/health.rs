use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_endpoints: Option<usize>,
}

impl HealthResponse {
    fn new(status: &'static str, tool_endpoints: Option<usize>) -> Self {
        Self {
            status,
            version: env!("CARGO_PKG_VERSION"),
            tool_endpoints,
        }
    }
}

/// GET /health - Liveness probe
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::new("healthy", None))
}

/// GET /ready - Readiness probe. Tool endpoints are contacted per request,
/// so readiness only reflects the bootstrap.
pub async fn ready_handler(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let endpoints = Some(state.chat.endpoints().len());

    if state.is_ready() {
        (StatusCode::OK, Json(HealthResponse::new("ready", endpoints)))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse::new("not_ready", endpoints)),
        )
    }
}
