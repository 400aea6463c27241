use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use geb_gateway::{config, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // Logging settings come from the config file; a broken file is reported
    // by the command itself
    let (level, format) = match config::load_config(&args.config) {
        Ok(cfg) => (cfg.server.log_level, cfg.server.log_format),
        Err(_) => ("info".to_string(), "text".to_string()),
    };
    init_tracing(&level, &format);

    match args.get_command() {
        cli::Commands::Start => commands::start::execute(&args.config).await?,
        cli::Commands::Test => commands::test::execute(&args.config)?,
        cli::Commands::Config { action } => match action {
            cli::ConfigCommands::Show => commands::config::show(&args.config)?,
            cli::ConfigCommands::Validate => commands::config::validate(&args.config)?,
        },
        cli::Commands::Price(price) => commands::price::execute(price, &args.config)?,
        cli::Commands::Version => {
            println!("GEB Gateway v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
