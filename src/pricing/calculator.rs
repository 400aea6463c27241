use serde::{Deserialize, Serialize};

use super::matrix::CostMatrix;
use crate::error::AppError;

/// One pricing simulation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingInput {
    pub base_cost: f64,
    pub complexity: String,
    pub location: String,
    pub project_value: f64,
    pub risk_level: String,
    #[serde(default)]
    pub timeline_days: Option<u32>,
    /// Month 1..=12 the project runs in; enables the seasonal factor
    #[serde(default)]
    pub month: Option<u32>,
    /// Replaces base margin plus risk premium when set
    #[serde(default)]
    pub custom_margin: Option<f64>,
}

/// Intermediate and final figures of one calculation, unrounded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    pub base_cost: f64,
    pub complexity_adjusted_cost: f64,
    pub administrative_cost: f64,
    pub seasonal_factor: f64,
    pub location_adjusted_cost: f64,
    pub margin_percentage: f64,
    pub margin_amount: f64,
    pub subtotal: f64,
    pub volume_discount_percentage: f64,
    pub volume_discount_amount: f64,
    pub final_price: f64,
    pub effective_margin: f64,
}

/// Price a project with `matrix`.
///
/// Pure and deterministic. Unknown complexity, location and risk keys fall
/// back to neutral values; a value outside every volume tier gets no
/// discount.
pub fn calculate(matrix: &CostMatrix, input: &PricingInput) -> Result<PricingResult, AppError> {
    validate(input)?;

    let complexity_factor = matrix.complexity_factor(&input.complexity);
    let complexity_adjusted_cost = input.base_cost * complexity_factor;

    let administrative_cost = complexity_adjusted_cost * (matrix.administrative_overhead / 100.0);
    let mut working_cost = complexity_adjusted_cost + administrative_cost;

    let seasonal_factor = input.month.map_or(1.0, |month| matrix.seasonal_factor(month));
    working_cost *= seasonal_factor;

    let location_adjusted_cost = working_cost * matrix.location_factor(&input.location);

    let margin_percentage = input
        .custom_margin
        .unwrap_or_else(|| matrix.base_margin + matrix.risk_premium(&input.risk_level));
    let margin_amount = location_adjusted_cost * (margin_percentage / 100.0);
    let subtotal = location_adjusted_cost + margin_amount;

    let volume_discount_percentage = matrix.volume_discount(input.project_value);
    let volume_discount_amount = subtotal * (volume_discount_percentage / 100.0);
    let final_price = subtotal - volume_discount_amount;

    let effective_margin = (final_price - input.base_cost) / input.base_cost * 100.0;

    Ok(PricingResult {
        base_cost: input.base_cost,
        complexity_adjusted_cost,
        administrative_cost,
        seasonal_factor,
        location_adjusted_cost,
        margin_percentage,
        margin_amount,
        subtotal,
        volume_discount_percentage,
        volume_discount_amount,
        final_price,
        effective_margin,
    })
}

fn validate(input: &PricingInput) -> Result<(), AppError> {
    if !input.base_cost.is_finite() || input.base_cost <= 0.0 {
        return Err(AppError::InvalidInput(format!(
            "base_cost must be a positive number, got {}",
            input.base_cost
        )));
    }

    if !input.project_value.is_finite() {
        return Err(AppError::InvalidInput(
            "project_value must be a finite number".to_string(),
        ));
    }

    if let Some(month) = input.month {
        if !(1..=12).contains(&month) {
            return Err(AppError::InvalidInput(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
    }

    if let Some(margin) = input.custom_margin {
        if !margin.is_finite() {
            return Err(AppError::InvalidInput(
                "custom_margin must be a finite number".to_string(),
            ));
        }
    }

    Ok(())
}
