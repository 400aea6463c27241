//! Control endpoints that drive the worker lifecycle and background sync

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::AppState;
use crate::{
    error::AppError,
    sync::PendingRequest,
    worker::{ActivateReport, InstallReport},
};

/// Re-run install on the active worker
pub async fn install(State(state): State<AppState>) -> Json<InstallReport> {
    let worker = state.worker.load_full();
    Json(worker.install().await)
}

pub async fn activate(State(state): State<AppState>) -> Json<ActivateReport> {
    let worker = state.worker.load_full();
    Json(worker.activate().await)
}

/// Cache names with their entry counts, plus the names the worker owns
pub async fn list_caches(State(state): State<AppState>) -> impl IntoResponse {
    let worker = state.worker.load_full();

    Json(json!({
        "worker": worker.state().await,
        "current": worker.settings().names,
        "caches": worker.storage().summary(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct SyncEvent {
    pub tag: String,
}

/// Fire a background sync event
pub async fn sync(
    State(state): State<AppState>,
    Json(event): Json<SyncEvent>,
) -> impl IntoResponse {
    let origin = state.worker.load_full().origin();
    Json(state.sync.handle_sync(&event.tag, origin.as_ref()).await)
}

/// Queue a submission that failed while offline. Entries that could never
/// be replayed are refused up front.
pub async fn enqueue(
    State(state): State<AppState>,
    Json(request): Json<PendingRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let id = request.id;
    info!(id = %id, url = %request.url, "Queued offline form");
    state.sync.queue().push(request).await?;

    Ok((StatusCode::ACCEPTED, Json(json!({ "id": id }))))
}
