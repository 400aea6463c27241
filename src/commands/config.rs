use anyhow::Result;
use colored::Colorize;
use geb_gateway::config;
use std::path::Path;
use tracing::info;

/// Execute the config show command
///
/// Prints the effective configuration (file plus environment overrides) as TOML
pub fn show(config_path: &Path) -> Result<()> {
    println!("{}", "Loading configuration...".yellow());
    info!("Loading configuration for display");

    let cfg = config::load_config(config_path)?;

    println!("{}", "Current Configuration:".green().bold());
    println!();
    println!("{}", toml::to_string_pretty(&cfg)?);

    info!("Configuration displayed successfully");
    Ok(())
}

/// Execute the config validate command
pub fn validate(config_path: &Path) -> Result<()> {
    println!("{}", "Validating configuration...".yellow());
    info!("Validating configuration file");

    let cfg = config::load_config(config_path)?;

    println!("{}", "✓ Configuration is valid".green());
    println!();
    println!("{}", "Summary:".bold());
    println!("  Origin: {}", cfg.origin.base_url);
    println!("  Cache version: {}", cfg.cache.version);
    println!("  Critical assets: {}", cfg.cache.critical_assets.len());

    info!("Configuration validation successful");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_renders_as_toml() {
        let rendered = toml::to_string_pretty(&config::Config::default()).unwrap();
        assert!(rendered.contains("[cache]"));
        assert!(rendered.contains("version = \"v1\""));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("geb-gateway-does-not-exist.toml");
        assert!(validate(&path).is_ok());
    }
}
