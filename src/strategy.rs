use axum::http::Method;
use serde::Serialize;

use crate::origin::FetchRequest;

/// How the cache router answers a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Not intercepted; forwarded to the origin untouched
    PassThrough,
    /// API calls: network, then cache, then 503 JSON
    NetworkFirst,
    /// Images, styles, scripts, fonts: cache, then network, then 404
    CacheFirst,
    /// Page loads: network, then cached page, then app shell, then offline page
    AppShell,
    /// Everything else: network, then cache, then 404
    NetworkWithCacheBackup,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::PassThrough => "pass_through",
            Strategy::NetworkFirst => "network_first",
            Strategy::CacheFirst => "cache_first",
            Strategy::AppShell => "app_shell",
            Strategy::NetworkWithCacheBackup => "network_with_cache_backup",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the strategy for `request`. Rules are evaluated in a fixed order
/// and the first match wins.
pub fn classify(request: &FetchRequest, api_prefix: &str) -> Strategy {
    if request.method != Method::GET {
        return Strategy::PassThrough;
    }

    if request.path().starts_with(api_prefix) {
        return Strategy::NetworkFirst;
    }

    if request.destination().is_static_asset() {
        return Strategy::CacheFirst;
    }

    if request.is_navigation() {
        return Strategy::AppShell;
    }

    Strategy::NetworkWithCacheBackup
}
