//! Health check endpoints for Kubernetes-style probes.
//!
//! - `/livez` - Basic liveness probe (immediate 200, no checks)
//! - `/healthz` - Pending queue length (fails if the key-value store is unreachable)

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::state::AppState;

/// GET /livez - Basic liveness probe.
#[axum::debug_handler]
pub async fn livez() -> StatusCode {
    StatusCode::OK
}

/// GET /healthz - Reports how many users are waiting to be flushed.
///
/// Returns 503 when the pending list cannot be read.
#[axum::debug_handler]
pub async fn healthz(State(state): State<AppState>) -> Response {
    match state.users.pending_count().await {
        Ok(pending) => (
            StatusCode::OK,
            Json(serde_json::json!({ "healthy": true, "pending": pending })),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "healthy": false, "error": err.to_string() })),
            )
                .into_response()
        }
    }
}
