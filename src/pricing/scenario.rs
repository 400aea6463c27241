//! Pricing scenarios: the direct cost of a unit-price analysis run through
//! a cost matrix.

use serde::{Deserialize, Serialize};

use super::{
    calculator::{calculate, PricingInput, PricingResult},
    matrix::CostMatrix,
    unit_price::UnitPriceAnalysis,
};
use crate::error::AppError;

/// Everything a `PricingInput` carries except the base cost, which comes
/// from the analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioParams {
    pub complexity: String,
    pub location: String,
    pub project_value: f64,
    pub risk_level: String,
    #[serde(default)]
    pub timeline_days: Option<u32>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub custom_margin: Option<f64>,
}

impl ScenarioParams {
    pub fn with_base_cost(&self, base_cost: f64) -> PricingInput {
        PricingInput {
            base_cost,
            complexity: self.complexity.clone(),
            location: self.location.clone(),
            project_value: self.project_value,
            risk_level: self.risk_level.clone(),
            timeline_days: self.timeline_days,
            month: self.month,
            custom_margin: self.custom_margin,
        }
    }
}

/// Price `analysis` with `matrix`. An analysis without cost is rejected
/// like any other non-positive base cost.
pub fn price_analysis(
    matrix: &CostMatrix,
    analysis: &UnitPriceAnalysis,
    params: &ScenarioParams,
) -> Result<PricingResult, AppError> {
    calculate(matrix, &params.with_base_cost(analysis.total_direct_cost()))
}
