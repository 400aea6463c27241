//! Dynamic pricing: cost matrices, the price simulation, the unit-price
//! cost breakdown and scenarios tying the two together. Everything here is pure and synchronous.

pub mod breakdown;
pub mod calculator;
pub mod catalog;
pub mod matrix;
pub mod scenario;
pub mod unit_price;

pub use breakdown::{aggregate, CategoryTotal, CostBreakdown, LineItem, ResourceCategory};
pub use calculator::{calculate, PricingInput, PricingResult};
pub use catalog::MatrixCatalog;
pub use matrix::{CostMatrix, MatrixType, VolumeTier, VolumeTiers};
pub use scenario::{price_analysis, ScenarioParams};
pub use unit_price::{UnitPriceAnalysis, UnitPriceSummary};
