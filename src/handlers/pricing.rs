use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AppState;
use crate::{
    error::AppError,
    pricing::{
        self, CostBreakdown, CostMatrix, LineItem, PricingInput, PricingResult, ScenarioParams,
        UnitPriceAnalysis, UnitPriceSummary,
    },
};

pub async fn list_matrices(State(state): State<AppState>) -> Json<Vec<CostMatrix>> {
    Json(state.catalog.all().to_vec())
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    /// Matrix name or type; the default matrix when absent
    #[serde(default)]
    pub matrix: Option<String>,
    pub input: PricingInput,
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub matrix: String,
    pub result: PricingResult,
}

pub async fn simulate(
    State(state): State<AppState>,
    Json(request): Json<SimulateRequest>,
) -> Result<Json<SimulateResponse>, AppError> {
    let matrix = state.catalog.select(request.matrix.as_deref())?;
    let result = pricing::calculate(matrix, &request.input)?;

    debug!(
        matrix = %matrix.name,
        base_cost = request.input.base_cost,
        final_price = result.final_price,
        "Pricing simulated"
    );

    Ok(Json(SimulateResponse {
        matrix: matrix.name.clone(),
        result,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ScenarioRequest {
    #[serde(default)]
    pub matrix: Option<String>,
    pub analysis: UnitPriceAnalysis,
    pub params: ScenarioParams,
}

/// Price a unit-price analysis: its total direct cost is the base cost
pub async fn scenario(
    State(state): State<AppState>,
    Json(request): Json<ScenarioRequest>,
) -> Result<Json<SimulateResponse>, AppError> {
    let matrix = state.catalog.select(request.matrix.as_deref())?;
    let result = pricing::price_analysis(matrix, &request.analysis, &request.params)?;

    debug!(
        matrix = %matrix.name,
        analysis = %request.analysis.code,
        final_price = result.final_price,
        "Scenario priced"
    );

    Ok(Json(SimulateResponse {
        matrix: matrix.name.clone(),
        result,
    }))
}

#[derive(Debug, Deserialize)]
pub struct BreakdownRequest {
    #[serde(default)]
    pub items: Vec<LineItem>,
}

pub async fn breakdown(Json(request): Json<BreakdownRequest>) -> Json<CostBreakdown> {
    Json(pricing::aggregate(&request.items))
}

#[derive(Debug, Deserialize)]
pub struct UnitPriceRequest {
    pub analysis: UnitPriceAnalysis,
}

pub async fn unit_price(
    Json(request): Json<UnitPriceRequest>,
) -> Result<Json<UnitPriceSummary>, AppError> {
    Ok(Json(request.analysis.summarize()?))
}
