use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub origin: OriginConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// The GEB web server the gateway fronts
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginConfig {
    #[serde(default = "default_origin_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_origin_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Offline cache settings
///
/// Cache names are derived as `{prefix}-static-{version}`,
/// `{prefix}-dynamic-{version}` and `{prefix}-pwa-{version}`. Bumping
/// `version` is the only way to invalidate cached content.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_prefix")]
    pub prefix: String,
    #[serde(default = "default_cache_version")]
    pub version: String,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Assets fetched into the static cache on install
    #[serde(default = "default_critical_assets")]
    pub critical_assets: Vec<String>,
    /// Client-side routes of the single page app
    #[serde(default = "default_app_routes")]
    pub app_routes: Vec<String>,
    /// Root document served as the offline app shell
    #[serde(default = "default_app_shell")]
    pub app_shell: String,
    /// Message carried in the 503 body of offline API responses
    #[serde(default = "default_offline_message")]
    pub offline_message: String,
    /// Responses with larger bodies are served but never cached
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix: default_cache_prefix(),
            version: default_cache_version(),
            api_prefix: default_api_prefix(),
            critical_assets: default_critical_assets(),
            app_routes: default_app_routes(),
            app_shell: default_app_shell(),
            offline_message: default_offline_message(),
            max_entry_bytes: default_max_entry_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default = "default_sync_tag")]
    pub tag: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tag: default_sync_tag(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PushConfig {
    #[serde(default = "default_push_title")]
    pub title: String,
    #[serde(default = "default_push_body")]
    pub default_body: String,
    #[serde(default = "default_push_icon")]
    pub icon: String,
    #[serde(default = "default_push_badge")]
    pub badge: String,
    #[serde(default = "default_vibrate")]
    pub vibrate: Vec<u32>,
    /// URL opened when the primary notification action is clicked
    #[serde(default = "default_app_shell")]
    pub open_url: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            title: default_push_title(),
            default_body: default_push_body(),
            icon: default_push_icon(),
            badge: default_push_badge(),
            vibrate: default_vibrate(),
            open_url: default_app_shell(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PricingConfig {
    /// JSON file with the cost matrix catalog; the built-in catalog is used when unset
    #[serde(default)]
    pub matrices_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_endpoint")]
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_metrics_endpoint(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_origin_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_cache_prefix() -> String {
    "geb".to_string()
}

fn default_cache_version() -> String {
    "v1".to_string()
}

fn default_api_prefix() -> String {
    "/api/".to_string()
}

fn default_critical_assets() -> Vec<String> {
    [
        "/",
        "/manifest.json",
        "/static/css/main.css",
        "/static/js/main.js",
        "/favicon.svg",
        "/logo.svg",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_app_routes() -> Vec<String> {
    [
        "/",
        "/dashboard",
        "/products",
        "/customers",
        "/sales",
        "/finances",
        "/marketing-analytics",
        "/dynamic-pricing",
        "/business-intelligence",
        "/reports",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_app_shell() -> String {
    "/".to_string()
}

fn default_offline_message() -> String {
    "Esta función requiere conexión a internet".to_string()
}

fn default_max_entry_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_sync_tag() -> String {
    crate::sync::FORM_SYNC_TAG.to_string()
}

fn default_push_title() -> String {
    "GEB Sistema".to_string()
}

fn default_push_body() -> String {
    "Nueva notificación de GEB".to_string()
}

fn default_push_icon() -> String {
    "/logo192.png".to_string()
}

fn default_push_badge() -> String {
    "/favicon.ico".to_string()
}

fn default_vibrate() -> Vec<u32> {
    vec![100, 50, 100]
}

fn default_true() -> bool {
    true
}

fn default_metrics_endpoint() -> String {
    "/metrics".to_string()
}

/// Load configuration from `path` (TOML, optional) overlaid with
/// `GEB_GATEWAY__SECTION__KEY` environment variables.
pub fn load_config(path: &Path) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()).required(false))
        .add_source(config::Environment::with_prefix("GEB_GATEWAY").separator("__"))
        .build()?;

    let cfg: Config = config.try_deserialize()?;
    validate_config(&cfg)?;

    Ok(cfg)
}

pub fn validate_config(cfg: &Config) -> anyhow::Result<()> {
    if cfg.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    if !matches!(cfg.server.log_format.as_str(), "text" | "json") {
        anyhow::bail!(
            "Invalid log format '{}': expected 'text' or 'json'",
            cfg.server.log_format
        );
    }

    if cfg.origin.base_url.trim().is_empty() {
        anyhow::bail!("Origin base_url cannot be empty");
    }

    if !cfg.origin.base_url.starts_with("http://") && !cfg.origin.base_url.starts_with("https://")
    {
        anyhow::bail!(
            "Origin base_url '{}' must start with http:// or https://",
            cfg.origin.base_url
        );
    }

    if cfg.cache.prefix.is_empty() || cfg.cache.version.is_empty() {
        anyhow::bail!("Cache prefix and version cannot be empty");
    }

    if !cfg.cache.api_prefix.starts_with('/') {
        anyhow::bail!(
            "API prefix '{}' must start with '/'",
            cfg.cache.api_prefix
        );
    }

    if cfg.cache.critical_assets.is_empty() {
        anyhow::bail!("At least one critical asset must be configured");
    }

    for asset in &cfg.cache.critical_assets {
        if !asset.starts_with('/') {
            anyhow::bail!("Critical asset '{}' must be an absolute path", asset);
        }
    }

    if cfg.sync.tag.is_empty() {
        anyhow::bail!("Sync tag cannot be empty");
    }

    Ok(())
}
