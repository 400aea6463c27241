use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::{
    config::Config,
    handlers::{self, AppState},
    metrics,
    origin::HttpOrigin,
    signals::setup_signal_handlers,
};

/// Largest request body the gateway buffers, control API and proxy alike
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Start the GEB gateway
///
/// This function:
/// 1. Initializes metrics
/// 2. Installs and activates the offline worker in front of the origin
/// 3. Sets up signal handlers for graceful shutdown and config reload
/// 4. Serves requests with graceful shutdown support
pub async fn start_server(config: Config, config_path: PathBuf) -> Result<()> {
    let metrics_handle = if config.metrics.enabled {
        info!("Initializing Prometheus metrics...");
        Some(Arc::new(metrics::init_metrics()?))
    } else {
        None
    };

    let origin = Arc::new(HttpOrigin::new(&config.origin)?);
    info!(origin = %origin.base_url(), "Fronting GEB origin");

    let state = AppState::new(config.clone(), origin)?;

    let worker = state.worker.load_full();
    let install = worker.install().await;
    if !install.is_complete() {
        warn!(
            failed = install.failed.len(),
            "Starting without a complete precache; offline navigation may fall back to the offline page"
        );
    }
    worker.activate().await;

    let (shutdown_tx, signal_handle) = setup_signal_handlers(state.clone(), config_path)?;
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app = create_router(state, metrics_handle, &config.metrics.endpoint);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting GEB gateway on {}", addr);
    info!(
        "Configuration: cache '{}-*-{}', API prefix {}, {} critical assets",
        config.cache.prefix,
        config.cache.version,
        config.cache.api_prefix,
        config.cache.critical_assets.len()
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Create the Axum router: control API under `/_gateway/`, optional
/// metrics endpoint, and the cache router for everything else
pub fn create_router(
    state: AppState,
    metrics_handle: Option<Arc<PrometheusHandle>>,
    metrics_endpoint: &str,
) -> Router {
    let control = Router::new()
        .route("/_gateway/health", get(handlers::health::health_check))
        .route("/_gateway/ready", get(handlers::health::readiness_check))
        .route("/_gateway/install", post(handlers::lifecycle::install))
        .route("/_gateway/activate", post(handlers::lifecycle::activate))
        .route("/_gateway/caches", get(handlers::lifecycle::list_caches))
        .route("/_gateway/sync", post(handlers::lifecycle::sync))
        .route("/_gateway/sync/queue", post(handlers::lifecycle::enqueue))
        .route("/_gateway/push", post(handlers::notifications::push_message))
        .route(
            "/_gateway/notifications/click",
            post(handlers::notifications::notification_click),
        )
        .route(
            "/_gateway/notifications/stream",
            get(handlers::notifications::notification_stream),
        )
        .route("/_gateway/pricing/matrices", get(handlers::pricing::list_matrices))
        .route("/_gateway/pricing/simulate", post(handlers::pricing::simulate))
        .route("/_gateway/pricing/scenario", post(handlers::pricing::scenario))
        .route("/_gateway/pricing/breakdown", post(handlers::pricing::breakdown))
        .route("/_gateway/pricing/unit-price", post(handlers::pricing::unit_price))
        .fallback(handlers::proxy::route_request)
        .with_state(state);

    let app = match metrics_handle {
        Some(handle) => control.merge(
            Router::new()
                .route(metrics_endpoint, get(handlers::metrics_handler::metrics))
                .with_state(handle),
        ),
        None => control,
    };

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
}
