use anyhow::Result;
use colored::Colorize;
use geb_gateway::{
    config,
    pricing::{self, MatrixCatalog, PricingInput, PricingResult},
};
use std::path::Path;
use tracing::info;

use crate::cli::PriceArgs;

/// Execute the price command: one simulation against the configured catalog
pub fn execute(args: PriceArgs, config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    let catalog = match &cfg.pricing.matrices_file {
        Some(path) => MatrixCatalog::from_file(path)?,
        None => MatrixCatalog::builtin(),
    };

    let matrix = catalog.select(args.matrix.as_deref())?;
    let input = to_input(&args);
    let result = pricing::calculate(matrix, &input)?;
    info!(matrix = %matrix.name, final_price = result.final_price, "Pricing simulated");

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&matrix.name, &result);
    }

    Ok(())
}

fn to_input(args: &PriceArgs) -> PricingInput {
    PricingInput {
        base_cost: args.base_cost,
        complexity: args.complexity.clone(),
        location: args.location.clone(),
        project_value: args.project_value,
        risk_level: args.risk_level.clone(),
        timeline_days: args.timeline_days,
        month: args.month,
        custom_margin: args.custom_margin,
    }
}

fn print_result(matrix: &str, result: &PricingResult) {
    println!("{} {}", "Matrix:".bold(), matrix);
    println!();
    println!("  {:<28} {:>14.2}", "Base cost", result.base_cost);
    println!("  {:<28} {:>14.2}", "Complexity adjusted", result.complexity_adjusted_cost);
    println!("  {:<28} {:>14.2}", "Administrative cost", result.administrative_cost);
    if result.seasonal_factor != 1.0 {
        println!("  {:<28} {:>14.2}", "Seasonal factor", result.seasonal_factor);
    }
    println!("  {:<28} {:>14.2}", "Location adjusted", result.location_adjusted_cost);
    println!(
        "  {:<28} {:>14.2}",
        format!("Margin ({:.1}%)", result.margin_percentage),
        result.margin_amount
    );
    println!("  {:<28} {:>14.2}", "Subtotal", result.subtotal);
    println!(
        "  {:<28} {:>14.2}",
        format!("Volume discount ({:.1}%)", result.volume_discount_percentage),
        result.volume_discount_amount
    );
    println!(
        "  {:<28} {:>14}",
        "Final price".green().bold(),
        format!("{:.2}", result.final_price).green().bold()
    );
    println!("  {:<28} {:>13.1}%", "Effective margin", result.effective_margin);
}
