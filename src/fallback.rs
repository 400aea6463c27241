//! Responses synthesized when neither the network nor the caches can answer

use axum::http::StatusCode;
use serde_json::json;

use crate::origin::FetchedResponse;

pub const ASSET_UNAVAILABLE: &str = "Asset not available offline";
pub const NOT_AVAILABLE: &str = "Not available offline";

/// 503 returned for API calls made while offline with nothing cached
pub fn offline_api(message: &str) -> FetchedResponse {
    let body = json!({
        "error": "Offline",
        "message": message,
        "offline": true,
    });
    FetchedResponse::new(
        StatusCode::SERVICE_UNAVAILABLE,
        "application/json",
        body.to_string(),
    )
}

/// 404 placeholder for a static asset that is neither cached nor reachable
pub fn asset_unavailable() -> FetchedResponse {
    FetchedResponse::new(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", ASSET_UNAVAILABLE)
}

/// 404 for any other request that failed with nothing cached
pub fn not_available() -> FetchedResponse {
    FetchedResponse::new(StatusCode::NOT_FOUND, "text/plain; charset=utf-8", NOT_AVAILABLE)
}

/// Self-contained offline page served when navigation fails and no app
/// shell is cached
pub fn offline_page() -> FetchedResponse {
    FetchedResponse::new(StatusCode::OK, "text/html", OFFLINE_PAGE)
}

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>GEB - Offline</title>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
      body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif;
        display: flex;
        flex-direction: column;
        align-items: center;
        justify-content: center;
        height: 100vh;
        margin: 0;
        background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
        color: white;
        text-align: center;
      }
      .offline-icon { font-size: 4rem; margin-bottom: 1rem; }
      .offline-title { font-size: 2rem; margin-bottom: 1rem; }
      .offline-message { font-size: 1.1rem; opacity: 0.9; max-width: 400px; }
      .retry-button {
        margin-top: 2rem;
        padding: 12px 24px;
        background: rgba(255,255,255,0.2);
        border: 2px solid white;
        color: white;
        border-radius: 8px;
        cursor: pointer;
        font-size: 1rem;
      }
      .retry-button:hover { background: rgba(255,255,255,0.3); }
    </style>
  </head>
  <body>
    <div class="offline-icon">&#128245;</div>
    <h1 class="offline-title">Sin Conexión</h1>
    <p class="offline-message">
      GEB funciona mejor con conexión a internet.
      Algunas funciones están disponibles offline.
    </p>
    <button class="retry-button" onclick="window.location.reload()">
      Reintentar
    </button>
  </body>
</html>
"#;
