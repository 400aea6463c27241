pub mod cache;
pub mod config;
pub mod error;
pub mod fallback;
pub mod handlers;
pub mod metrics;
pub mod origin;
pub mod pricing;
pub mod push;
pub mod server;
pub mod signals;
pub mod strategy;
pub mod sync;
pub mod worker;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing/logging
///
/// `RUST_LOG` wins over `level`. `format` is `text` or `json`.
/// This function can only be called once per process.
pub fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    if format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
