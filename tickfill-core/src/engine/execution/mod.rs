//! Execution pricing: fill price resolution and fee calculation.

pub mod cost_model;
pub mod fill_price;

pub use cost_model::{CostModel, FeeRule};
pub use fill_price::{resolve_fill, ResolvedFill, TickSideConvention};
