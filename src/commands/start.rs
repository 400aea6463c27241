use anyhow::Result;
use colored::Colorize;
use geb_gateway::{config, server};
use std::path::Path;
use tracing::info;

/// Execute the start command: load configuration and serve until a
/// shutdown signal arrives
pub async fn execute(config_path: &Path) -> Result<()> {
    println!("{}", "Starting GEB gateway...".green());

    let cfg = config::load_config(config_path)?;
    info!(config = %config_path.display(), "Starting GEB gateway in foreground mode");

    server::start_server(cfg, config_path.to_path_buf()).await?;

    Ok(())
}
