use serde::Serialize;

use crate::config::CacheConfig;

/// The three cache namespaces of one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheNames {
    prefix: String,
    /// Build-time assets (critical assets, images, styles, scripts, fonts)
    pub static_cache: String,
    /// Runtime API and miscellaneous responses
    pub dynamic_cache: String,
    /// General namespace kept for compatibility with older deployments
    pub legacy_cache: String,
}

impl CacheNames {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            static_cache: format!("{}-static-{}", prefix, version),
            dynamic_cache: format!("{}-dynamic-{}", prefix, version),
            legacy_cache: format!("{}-pwa-{}", prefix, version),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.prefix, &config.version)
    }

    /// True for names this application owns (`{prefix}-...`)
    pub fn is_namespaced(&self, name: &str) -> bool {
        name.strip_prefix(&self.prefix)
            .is_some_and(|rest| rest.starts_with('-'))
    }

    /// True for names that activation must delete: owned by this
    /// application but neither the current static nor dynamic cache.
    ///
    /// The legacy name is not exempt, matching the cleanup rule.
    pub fn is_stale(&self, name: &str) -> bool {
        self.is_namespaced(name) && name != self.static_cache && name != self.dynamic_cache
    }
}
