//! Fallback handler: every request that is not a control endpoint goes
//! through the active worker.

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    response::{IntoResponse, Response},
};

use super::AppState;
use crate::{error::AppError, origin::FetchRequest, server::MAX_BODY_BYTES};

/// Which side answered: `network`, `cache` or `offline`
pub const SOURCE_HEADER: HeaderName = HeaderName::from_static("x-geb-source");
/// Strategy the router applied
pub const STRATEGY_HEADER: HeaderName = HeaderName::from_static("x-geb-strategy");

pub async fn route_request(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();
    let body = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::InvalidInput(format!("Failed to read request body: {}", e)))?;

    let path_and_query = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), |pq| pq.as_str().to_string());

    let mut fetch = FetchRequest::new(parts.method, path_and_query).with_body(body);
    fetch.headers = parts.headers;

    let worker = state.worker.load_full();
    let routed = worker.handle_fetch(fetch).await?;

    let mut response = routed.response.into_response();
    let headers = response.headers_mut();
    headers.insert(SOURCE_HEADER, HeaderValue::from_static(routed.source.as_str()));
    headers.insert(STRATEGY_HEADER, HeaderValue::from_static(routed.strategy.as_str()));

    Ok(response)
}
