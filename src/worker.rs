//! The offline worker: lifecycle (install, activate) and per-request
//! strategy execution over the shared cache storage.

use arc_swap::ArcSwap;
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::{
    cache::{CacheNames, CacheStorage},
    config::CacheConfig,
    error::AppError,
    fallback, metrics,
    origin::{CacheKey, FetchRequest, FetchedResponse, Origin},
    strategy::{self, Strategy},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    /// Controls clients: requests are routed through the strategies
    Activated,
    /// Replaced by a newer deployment
    Redundant,
}

/// Where a routed response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Offline,
}

impl ResponseSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Offline => "offline",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Routed {
    pub response: FetchedResponse,
    pub strategy: Strategy,
    pub source: ResponseSource,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub names: CacheNames,
    pub api_prefix: String,
    pub critical_assets: Vec<String>,
    pub app_shell: String,
    pub offline_message: String,
}

impl WorkerSettings {
    pub fn from_config(config: &CacheConfig) -> Self {
        Self {
            names: CacheNames::from_config(config),
            api_prefix: config.api_prefix.clone(),
            critical_assets: config.critical_assets.clone(),
            app_shell: config.app_shell.clone(),
            offline_message: config.offline_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetFailure {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub cache: String,
    pub cached: Vec<String>,
    pub failed: Vec<AssetFailure>,
}

impl InstallReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    pub kept: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub install: InstallReport,
    pub activate: ActivateReport,
}

pub struct OfflineWorker {
    settings: WorkerSettings,
    storage: Arc<CacheStorage>,
    origin: Arc<dyn Origin>,
    state: RwLock<LifecycleState>,
}

impl OfflineWorker {
    pub fn new(settings: WorkerSettings, storage: Arc<CacheStorage>, origin: Arc<dyn Origin>) -> Self {
        Self {
            settings,
            storage,
            origin,
            state: RwLock::new(LifecycleState::Parsed),
        }
    }

    pub fn settings(&self) -> &WorkerSettings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<CacheStorage> {
        &self.storage
    }

    pub fn origin(&self) -> Arc<dyn Origin> {
        self.origin.clone()
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// True once activation has claimed the clients
    pub async fn controls_clients(&self) -> bool {
        self.state().await == LifecycleState::Activated
    }

    async fn set_state(&self, state: LifecycleState) {
        *self.state.write().await = state;
    }

    /// Precache the critical assets into the static cache.
    ///
    /// All or nothing: when any asset fails to fetch, nothing is stored and
    /// the failures are reported. The worker still reaches `Installed` so a
    /// broken asset never wedges a deployment. On an activating or activated
    /// worker this only refreshes the precache and leaves the lifecycle state
    /// alone; a retired worker ignores it.
    pub async fn install(&self) -> InstallReport {
        let state = self.state().await;
        if state == LifecycleState::Redundant {
            warn!("Ignoring install on a retired worker");
            return InstallReport {
                cache: self.settings.names.static_cache.clone(),
                cached: Vec::new(),
                failed: Vec::new(),
            };
        }

        let first_install = matches!(
            state,
            LifecycleState::Parsed | LifecycleState::Installing | LifecycleState::Installed
        );
        if first_install {
            self.set_state(LifecycleState::Installing).await;
            info!("Installing offline worker...");
        } else {
            info!("Refreshing precached assets");
        }

        let cache = self.storage.open(&self.settings.names.static_cache);
        info!(
            cache = %cache.name(),
            assets = self.settings.critical_assets.len(),
            "Caching critical assets"
        );

        let fetches = self.settings.critical_assets.iter().map(|path| async move {
            let request = FetchRequest::get(path.as_str());
            let result = self.origin.fetch(&request).await;
            (request, result)
        });

        let mut fetched = Vec::new();
        let mut failed = Vec::new();
        for (request, result) in join_all(fetches).await {
            match result {
                Ok(response) if !response.is_ok() => failed.push(AssetFailure {
                    path: request.path_and_query,
                    reason: format!("HTTP {}", response.status.as_u16()),
                }),
                Ok(response) if !cache.accepts(&response) => failed.push(AssetFailure {
                    path: request.path_and_query,
                    reason: format!("{} bytes exceeds the cache entry limit", response.body.len()),
                }),
                Ok(response) => fetched.push((request.cache_key(), response.for_storage())),
                Err(e) => failed.push(AssetFailure {
                    path: request.path_and_query,
                    reason: e.to_string(),
                }),
            }
        }

        let mut cached = Vec::new();
        if failed.is_empty() {
            for (key, response) in fetched {
                match cache.put(key.clone(), response) {
                    Ok(()) => cached.push(key.to_string()),
                    Err(e) => failed.push(AssetFailure {
                        path: key.to_string(),
                        reason: e.to_string(),
                    }),
                }
            }
        }

        if failed.is_empty() {
            info!(count = cached.len(), "Critical assets cached successfully");
        } else {
            error!(failed = ?failed, "Failed to cache critical assets");
        }

        if first_install {
            self.set_state(LifecycleState::Installed).await;
        }

        InstallReport {
            cache: cache.name().to_string(),
            cached,
            failed,
        }
    }

    /// Delete caches from older deployments, then claim clients
    pub async fn activate(&self) -> ActivateReport {
        self.set_state(LifecycleState::Activating).await;
        info!("Activating offline worker...");

        let mut deleted = Vec::new();
        for name in self.storage.keys() {
            if self.settings.names.is_stale(&name) && self.storage.delete(&name) {
                info!(cache = %name, "Deleting old cache");
                deleted.push(name);
            }
        }
        metrics::record_caches_deleted(deleted.len());

        self.set_state(LifecycleState::Activated).await;
        info!("Offline worker activated, clients claimed");

        ActivateReport {
            deleted,
            kept: self.storage.keys(),
        }
    }

    /// Stop routing and stop writing to caches; used when a newer
    /// deployment takes over
    pub async fn retire(&self) {
        self.set_state(LifecycleState::Redundant).await;
    }

    /// Answer one request.
    ///
    /// Only pass-through requests can fail; every intercepted strategy ends
    /// in a cached or synthesized response when the network is down.
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<Routed, AppError> {
        let strategy = if self.controls_clients().await {
            strategy::classify(&request, &self.settings.api_prefix)
        } else {
            Strategy::PassThrough
        };

        let routed = match strategy {
            Strategy::PassThrough => Routed {
                response: self.origin.fetch(&request).await?,
                strategy,
                source: ResponseSource::Network,
            },
            Strategy::NetworkFirst => self.network_first(&request).await,
            Strategy::CacheFirst => self.cache_first(&request).await,
            Strategy::AppShell => self.app_shell(&request).await,
            Strategy::NetworkWithCacheBackup => self.network_with_cache_backup(&request).await,
        };

        metrics::record_route(strategy.as_str(), routed.source.as_str());
        if routed.source == ResponseSource::Offline {
            metrics::record_offline_fallback(strategy.as_str());
        }

        Ok(routed)
    }

    async fn network_first(&self, request: &FetchRequest) -> Routed {
        let strategy = Strategy::NetworkFirst;
        let key = request.cache_key();

        match self.origin.fetch(request).await {
            Ok(response) => {
                self.store(&self.settings.names.dynamic_cache, request, &response).await;
                network(response, strategy)
            }
            Err(e) => {
                info!(url = %key, error = %e, "API request failed, trying cache");
                match self.lookup(&key, strategy) {
                    Some(cached) => from_cache(cached, strategy),
                    None => offline(fallback::offline_api(&self.settings.offline_message), strategy),
                }
            }
        }
    }

    async fn cache_first(&self, request: &FetchRequest) -> Routed {
        let strategy = Strategy::CacheFirst;
        let key = request.cache_key();

        if let Some(cached) = self.lookup(&key, strategy) {
            return from_cache(cached, strategy);
        }

        match self.origin.fetch(request).await {
            Ok(response) => {
                self.store(&self.settings.names.static_cache, request, &response).await;
                network(response, strategy)
            }
            Err(e) => {
                error!(url = %key, error = %e, "Failed to load static asset");
                offline(fallback::asset_unavailable(), strategy)
            }
        }
    }

    async fn app_shell(&self, request: &FetchRequest) -> Routed {
        let strategy = Strategy::AppShell;

        match self.origin.fetch(request).await {
            Ok(response) => network(response, strategy),
            Err(e) => {
                info!(url = %request.path_and_query, error = %e, "Navigation offline, serving cached app shell");

                if let Some(cached) = self.lookup(&request.cache_key(), strategy) {
                    return from_cache(cached, strategy);
                }

                let shell = CacheKey::new(self.settings.app_shell.clone());
                match self.lookup(&shell, strategy) {
                    Some(cached) => from_cache(cached, strategy),
                    None => offline(fallback::offline_page(), strategy),
                }
            }
        }
    }

    async fn network_with_cache_backup(&self, request: &FetchRequest) -> Routed {
        let strategy = Strategy::NetworkWithCacheBackup;
        let key = request.cache_key();

        match self.origin.fetch(request).await {
            Ok(response) => {
                self.store(&self.settings.names.dynamic_cache, request, &response).await;
                network(response, strategy)
            }
            Err(e) => {
                debug!(url = %key, error = %e, "Request failed, trying cache");
                match self.lookup(&key, strategy) {
                    Some(cached) => from_cache(cached, strategy),
                    None => offline(fallback::not_available(), strategy),
                }
            }
        }
    }

    /// A private key matches the client's own entry first, then the shared one
    fn lookup(&self, key: &CacheKey, strategy: Strategy) -> Option<FetchedResponse> {
        let cached = self.storage.match_request(key).or_else(|| {
            key.is_private()
                .then(|| self.storage.match_request(&key.shared()))
                .flatten()
        });
        metrics::record_cache_lookup(strategy.as_str(), cached.is_some());
        cached
    }

    /// Best-effort write: failures are logged and never reach the caller
    async fn store(&self, cache_name: &str, request: &FetchRequest, response: &FetchedResponse) {
        let Some(key) = storage_key(request, response) else {
            debug!(cache = %cache_name, url = %request.path_and_query, "Response not cacheable");
            return;
        };

        // A retired worker must not recreate caches the new deployment deleted
        if self.state().await == LifecycleState::Redundant {
            debug!(cache = %cache_name, url = %key, "Skipping cache write from retired worker");
            return;
        }

        if let Err(e) = self.storage.open(cache_name).put(key.clone(), response.for_storage()) {
            warn!(cache = %cache_name, url = %key, error = %e, "Cache write failed");
            metrics::record_cache_write_failure(cache_name);
        }
    }
}

/// Key to store `response` under, `None` when it must not be cached.
///
/// Only successful responses are kept and never when marked `no-store`.
/// A response meant for one client is kept only under that client's
/// private key, so an anonymous request cannot publish it.
fn storage_key(request: &FetchRequest, response: &FetchedResponse) -> Option<CacheKey> {
    if !response.is_ok() || response.has_cache_directive("no-store") {
        return None;
    }

    let key = request.cache_key();
    if !key.is_private() && response.is_client_specific() {
        return None;
    }
    Some(key)
}

fn network(response: FetchedResponse, strategy: Strategy) -> Routed {
    Routed {
        response,
        strategy,
        source: ResponseSource::Network,
    }
}

fn from_cache(response: FetchedResponse, strategy: Strategy) -> Routed {
    Routed {
        response,
        strategy,
        source: ResponseSource::Cache,
    }
}

fn offline(response: FetchedResponse, strategy: Strategy) -> Routed {
    Routed {
        response,
        strategy,
        source: ResponseSource::Offline,
    }
}

/// Roll out `next`: install it, make it the active worker, retire the
/// previous one and finally activate, deleting the old caches.
pub async fn deploy(slot: &ArcSwap<OfflineWorker>, next: OfflineWorker) -> DeployReport {
    let install = next.install().await;

    let next = Arc::new(next);
    let previous = slot.swap(next.clone());
    if !Arc::ptr_eq(&previous, &next) {
        previous.retire().await;
    }

    let activate = next.activate().await;

    DeployReport { install, activate }
}
