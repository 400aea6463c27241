use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "geb-gateway", version, about = "GEB offline gateway and pricing calculator")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml", global = true, env = "GEB_GATEWAY_CONFIG")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the gateway server (default)
    Start,

    /// Test configuration file validity
    Test,

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Run a pricing simulation against a cost matrix
    Price(PriceArgs),

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Validate configuration file
    Validate,
}

#[derive(Args, Debug, Clone)]
pub struct PriceArgs {
    /// Direct cost of the project
    #[arg(long)]
    pub base_cost: f64,

    /// Total project value, selects the volume tier
    #[arg(long)]
    pub project_value: f64,

    #[arg(long, default_value = "moderate")]
    pub complexity: String,

    #[arg(long, default_value = "lima")]
    pub location: String,

    #[arg(long, default_value = "medium")]
    pub risk_level: String,

    #[arg(long)]
    pub timeline_days: Option<u32>,

    /// Project month (1-12), applies the seasonal factor
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
    pub month: Option<u32>,

    /// Margin percentage replacing base margin plus risk premium
    #[arg(long)]
    pub custom_margin: Option<f64>,

    /// Matrix name or type; the default matrix when omitted
    #[arg(short, long)]
    pub matrix: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Get the command to execute, defaulting to Start if none provided
    pub fn get_command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Start)
    }
}
