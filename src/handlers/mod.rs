pub mod health;
pub mod lifecycle;
pub mod metrics_handler;
pub mod notifications;
pub mod pricing;
pub mod proxy;

use arc_swap::ArcSwap;
use std::sync::Arc;

use crate::{
    cache::CacheStorage,
    config::Config,
    error::AppError,
    origin::Origin,
    pricing::MatrixCatalog,
    push::NotificationCenter,
    sync::{BackgroundSync, MemoryQueue},
    worker::{OfflineWorker, WorkerSettings},
};

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<Config>>,
    /// The worker currently controlling clients; replaced on redeploy
    pub worker: Arc<ArcSwap<OfflineWorker>>,
    pub sync: Arc<BackgroundSync>,
    pub notifications: NotificationCenter,
    pub catalog: Arc<MatrixCatalog>,
}

impl AppState {
    /// Wire up a fresh, not yet installed worker in front of `origin`
    pub fn new(config: Config, origin: Arc<dyn Origin>) -> Result<Self, AppError> {
        let catalog = match &config.pricing.matrices_file {
            Some(path) => MatrixCatalog::from_file(path)?,
            None => MatrixCatalog::builtin(),
        };

        let storage = Arc::new(CacheStorage::new(config.cache.max_entry_bytes));
        let worker = OfflineWorker::new(WorkerSettings::from_config(&config.cache), storage, origin);
        let sync = BackgroundSync::new(config.sync.tag.clone(), Arc::new(MemoryQueue::new()));

        Ok(Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            worker: Arc::new(ArcSwap::from_pointee(worker)),
            sync: Arc::new(sync),
            notifications: NotificationCenter::default(),
            catalog: Arc::new(catalog),
        })
    }
}
