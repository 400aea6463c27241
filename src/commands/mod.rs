//! Command implementations for the CLI
//!
//! - start: Start the gateway server
//! - test: Test configuration validity
//! - config: Configuration display and validation
//! - price: Run a pricing simulation

pub mod config;
pub mod price;
pub mod start;
