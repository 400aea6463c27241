use serde::{Deserialize, Serialize};

use super::breakdown::{aggregate, CostBreakdown, LineItem};
use crate::error::AppError;

/// Unit-price analysis of one service: its resource lines and the factors
/// applied on top of their direct cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPriceAnalysis {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_factor")]
    pub performance_factor: f64,
    #[serde(default = "default_factor")]
    pub difficulty_factor: f64,
    /// Percent
    #[serde(default = "default_administrative_percentage")]
    pub administrative_percentage: f64,
    /// Percent
    #[serde(default = "default_profit_margin")]
    pub profit_margin: f64,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

fn default_factor() -> f64 {
    1.0
}

fn default_administrative_percentage() -> f64 {
    5.0
}

fn default_profit_margin() -> f64 {
    15.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitPriceSummary {
    pub total_direct_cost: f64,
    pub adjusted_cost: f64,
    pub administrative_cost: f64,
    pub subtotal: f64,
    pub profit_amount: f64,
    pub unit_price: f64,
    pub breakdown: CostBreakdown,
}

impl UnitPriceAnalysis {
    pub fn total_direct_cost(&self) -> f64 {
        self.items.iter().map(LineItem::total_cost).sum()
    }

    pub fn summarize(&self) -> Result<UnitPriceSummary, AppError> {
        for (name, value) in [
            ("performance_factor", self.performance_factor),
            ("difficulty_factor", self.difficulty_factor),
            ("administrative_percentage", self.administrative_percentage),
            ("profit_margin", self.profit_margin),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let breakdown = aggregate(&self.items);
        let total_direct_cost = breakdown.total_direct_cost;

        let adjusted_cost = total_direct_cost * self.performance_factor * self.difficulty_factor;
        let administrative_cost = adjusted_cost * (self.administrative_percentage / 100.0);
        let subtotal = adjusted_cost + administrative_cost;
        let profit_amount = subtotal * (self.profit_margin / 100.0);

        Ok(UnitPriceSummary {
            total_direct_cost,
            adjusted_cost,
            administrative_cost,
            subtotal,
            profit_amount,
            unit_price: subtotal + profit_amount,
            breakdown,
        })
    }
}
