use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use crate::{
    config,
    handlers::AppState,
    origin::HttpOrigin,
    worker::{self, DeployReport, OfflineWorker, WorkerSettings},
};

/// Shutdown signal types
#[derive(Debug, Clone, Copy)]
pub enum ShutdownSignal {
    /// Graceful shutdown (drain connections, clean up)
    Graceful,
}

/// Setup signal handlers for the server
///
/// Returns a broadcast sender for shutdown signals and a join handle for the signal task
///
/// Handles:
/// - SIGTERM/SIGINT: Graceful shutdown
/// - SIGHUP: Configuration reload and worker redeploy
#[cfg(unix)]
pub fn setup_signal_handlers(
    state: AppState,
    config_path: PathBuf,
) -> Result<(broadcast::Sender<ShutdownSignal>, tokio::task::JoinHandle<()>)> {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx_clone = shutdown_tx.clone();

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("SIGTERM received, initiating graceful shutdown");
                    let _ = tx_clone.send(ShutdownSignal::Graceful);
                    break;
                }
                _ = sigint.recv() => {
                    info!("SIGINT received, initiating graceful shutdown");
                    let _ = tx_clone.send(ShutdownSignal::Graceful);
                    break;
                }
                _ = sighup.recv() => {
                    info!("SIGHUP received, reloading configuration");
                    match reload(&state, &config_path).await {
                        Ok(report) => info!(
                            cached = report.install.cached.len(),
                            deleted = report.activate.deleted.len(),
                            "Configuration reloaded and worker redeployed"
                        ),
                        Err(e) => error!("Failed to reload configuration: {}", e),
                    }
                }
            }
        }
    });

    Ok((shutdown_tx, handle))
}

/// Non-unix platforms: Ctrl+C only, no reload
#[cfg(not(unix))]
pub fn setup_signal_handlers(
    _state: AppState,
    _config_path: PathBuf,
) -> Result<(broadcast::Sender<ShutdownSignal>, tokio::task::JoinHandle<()>)> {
    let (shutdown_tx, _) = broadcast::channel(16);
    let tx_clone = shutdown_tx.clone();

    let handle = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received, initiating shutdown");
                let _ = tx_clone.send(ShutdownSignal::Graceful);
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    Ok((shutdown_tx, handle))
}

/// Load and validate the configuration at `path`, then deploy a worker
/// built from it over the existing cache storage.
///
/// If loading fails the running configuration and worker stay in place.
/// The sync tag and the pricing catalog are fixed at startup.
pub async fn reload(state: &AppState, path: &Path) -> Result<DeployReport> {
    info!("Loading new configuration...");
    let new_config = config::load_config(path)?;

    info!(
        "New configuration loaded. Origin: {}, cache version: {}",
        new_config.origin.base_url, new_config.cache.version
    );

    let origin = Arc::new(HttpOrigin::new(&new_config.origin)?);
    let storage = state.worker.load().storage().clone();
    let next = OfflineWorker::new(WorkerSettings::from_config(&new_config.cache), storage, origin);

    state.config.store(Arc::new(new_config));
    let report = worker::deploy(&state.worker, next).await;

    Ok(report)
}
