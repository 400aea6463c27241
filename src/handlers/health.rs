use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::AppState;

/// Health check endpoint
/// Returns 200 OK if the process is running
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "geb-gateway",
            "version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

/// Readiness check endpoint
/// Ready once the active worker has been activated and controls clients
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let worker = state.worker.load_full();
    let lifecycle = worker.state().await;

    let (status, label) = if worker.controls_clients().await {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(json!({
            "status": label,
            "service": "geb-gateway",
            "worker": lifecycle,
        })),
    )
}
