/// Integration tests for the cache router, driven through the axum app
/// against an httpmock origin
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use geb_gateway::{
    config::Config,
    handlers::AppState,
    origin::HttpOrigin,
    server::create_router,
    worker::{self, OfflineWorker, WorkerSettings},
};
use httpmock::prelude::*;
use std::sync::Arc;
use tower::ServiceExt;

const UNREACHABLE: &str = "http://127.0.0.1:1";

fn config_for(base_url: &str) -> Config {
    let mut cfg = Config::default();
    cfg.origin.base_url = base_url.to_string();
    cfg
}

/// State with an activated (but not installed) worker in front of `base_url`
async fn activated_state(base_url: &str) -> AppState {
    let cfg = config_for(base_url);
    let origin = Arc::new(HttpOrigin::new(&cfg.origin).unwrap());
    let state = AppState::new(cfg, origin).unwrap();
    state.worker.load_full().activate().await;
    state
}

fn app(state: &AppState) -> Router {
    create_router(state.clone(), None, "/metrics")
}

/// Swap in a worker that shares the cache storage but can't reach the network
async fn go_offline(state: &AppState) {
    let cfg = config_for(UNREACHABLE);
    let storage = state.worker.load().storage().clone();
    let offline = OfflineWorker::new(
        WorkerSettings::from_config(&cfg.cache),
        storage,
        Arc::new(HttpOrigin::new(&cfg.origin).unwrap()),
    );
    worker::deploy(&state.worker, offline).await;
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_install_precaches_critical_assets() {
    let server = MockServer::start_async().await;
    let mut mocks = Vec::new();
    for path in Config::default().cache.critical_assets {
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path(path.as_str());
                then.status(200).body("asset");
            })
            .await;
        mocks.push(mock);
    }

    let state = activated_state(&server.base_url()).await;
    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_gateway/install")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let report: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(report["cache"], "geb-static-v1");
    assert_eq!(report["cached"].as_array().unwrap().len(), 6);
    assert!(report["failed"].as_array().unwrap().is_empty());

    for mock in &mocks {
        mock.assert_hits_async(1).await;
    }
}

#[tokio::test]
async fn test_api_success_is_cached_and_served_offline() {
    let server = MockServer::start_async().await;
    let api = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/products/");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"[{"id":1}]"#);
        })
        .await;

    let state = activated_state(&server.base_url()).await;

    let response = app(&state).oneshot(get("/api/products/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-geb-source"], "network");
    api.assert_hits_async(1).await;

    go_offline(&state).await;

    let response = app(&state).oneshot(get("/api/products/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-geb-source"], "cache");
    assert_eq!(response.headers()["content-type"], "application/json");
    assert_eq!(body_string(response).await, r#"[{"id":1}]"#);
}

fn get_as(uri: &str, authorization: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", authorization)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cached_api_response_is_not_served_to_another_client() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/customers/")
                .header("authorization", "Bearer alice");
            then.status(200)
                .header("content-type", "application/json")
                .header("set-cookie", "sessionid=alice")
                .body(r#"[{"owner":"alice"}]"#);
        })
        .await;

    let state = activated_state(&server.base_url()).await;
    let response = app(&state)
        .oneshot(get_as("/api/customers/", "Bearer alice"))
        .await
        .unwrap();
    assert_eq!(response.headers()["x-geb-source"], "network");

    go_offline(&state).await;

    let response = app(&state)
        .oneshot(get_as("/api/customers/", "Bearer bob"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()["x-geb-source"], "offline");

    let response = app(&state)
        .oneshot(get_as("/api/customers/", "Bearer alice"))
        .await
        .unwrap();
    assert_eq!(response.headers()["x-geb-source"], "cache");
    assert!(response.headers().get("set-cookie").is_none());
    assert_eq!(body_string(response).await, r#"[{"owner":"alice"}]"#);
}

#[tokio::test]
async fn test_api_offline_without_cache_is_503_json() {
    let state = activated_state(UNREACHABLE).await;

    let response = app(&state).oneshot(get("/api/sales/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.headers()["content-type"], "application/json");
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "error": "Offline",
            "message": "Esta función requiere conexión a internet",
            "offline": true
        })
    );
}

#[tokio::test]
async fn test_post_passes_through_and_is_not_cached() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/sales/").body(r#"{"total":10}"#);
            then.status(201).body("created");
        })
        .await;

    let state = activated_state(&server.base_url()).await;
    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/sales/")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"total":10}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-geb-strategy"], "pass_through");
    create.assert_hits_async(1).await;

    let storage = state.worker.load().storage().clone();
    assert!(!storage.has("geb-dynamic-v1"));
}

#[tokio::test]
async fn test_error_status_is_returned_but_not_cached() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/reports/");
            then.status(500).body("boom");
        })
        .await;

    let state = activated_state(&server.base_url()).await;
    let response = app(&state).oneshot(get("/api/reports/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.headers()["x-geb-source"], "network");

    go_offline(&state).await;
    let response = app(&state).oneshot(get("/api/reports/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_static_asset_is_served_from_cache_first() {
    let server = MockServer::start_async().await;
    let script = server
        .mock_async(|when, then| {
            when.method(GET).path("/static/js/chunk.js");
            then.status(200)
                .header("content-type", "application/javascript")
                .body("console.log(1)");
        })
        .await;

    let state = activated_state(&server.base_url()).await;
    let request = || {
        Request::builder()
            .uri("/static/js/chunk.js")
            .header("sec-fetch-dest", "script")
            .body(Body::empty())
            .unwrap()
    };

    let first = app(&state).oneshot(request()).await.unwrap();
    assert_eq!(first.headers()["x-geb-source"], "network");

    let second = app(&state).oneshot(request()).await.unwrap();
    assert_eq!(second.headers()["x-geb-source"], "cache");
    assert_eq!(body_string(second).await, "console.log(1)");

    script.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_offline_asset_miss_is_plain_404() {
    let state = activated_state(UNREACHABLE).await;
    let response = app(&state)
        .oneshot(
            Request::builder()
                .uri("/static/media/hero.png")
                .header("sec-fetch-dest", "image")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_string(response).await, "Asset not available offline");
}

#[tokio::test]
async fn test_offline_navigation_falls_back_to_app_shell() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/");
            then.status(200)
                .header("content-type", "text/html")
                .body("<html>shell</html>");
        })
        .await;

    let state = activated_state(&server.base_url()).await;
    let navigate = |uri: &str| {
        Request::builder()
            .uri(uri)
            .header("sec-fetch-mode", "navigate")
            .body(Body::empty())
            .unwrap()
    };

    // Navigation responses are not stored, so prime the shell through the
    // catch-all strategy
    let response = app(&state).oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    go_offline(&state).await;

    let response = app(&state).oneshot(navigate("/dashboard")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-geb-strategy"], "app_shell");
    assert_eq!(body_string(response).await, "<html>shell</html>");
}

#[tokio::test]
async fn test_offline_navigation_without_shell_serves_offline_page() {
    let state = activated_state(UNREACHABLE).await;
    let response = app(&state)
        .oneshot(
            Request::builder()
                .uri("/sales")
                .header("sec-fetch-mode", "navigate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(response.headers()["x-geb-source"], "offline");
}

#[tokio::test]
async fn test_activation_deletes_only_stale_prefixed_caches() {
    let state = activated_state(UNREACHABLE).await;
    let storage = state.worker.load().storage().clone();
    storage.open("geb-static-v0");
    storage.open("geb-pwa-v1");
    storage.open("geb-dynamic-v1");
    storage.open("third-party-cache");

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_gateway/activate")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    assert!(!storage.has("geb-static-v0"));
    assert!(!storage.has("geb-pwa-v1"));
    assert!(storage.has("geb-dynamic-v1"));
    assert!(storage.has("third-party-cache"));
}

#[tokio::test]
async fn test_background_sync_replays_queued_forms() {
    let server = MockServer::start_async().await;
    let replay = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/customers/");
            then.status(201);
        })
        .await;

    let state = activated_state(&server.base_url()).await;

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_gateway/sync/queue")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"url": "/api/customers/", "body": "e30="}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let response = app(&state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/_gateway/sync")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"tag": "background-sync-forms"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    let report: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(report["handled"], true);
    assert_eq!(report["synced"].as_array().unwrap().len(), 1);
    replay.assert_hits_async(1).await;
}
