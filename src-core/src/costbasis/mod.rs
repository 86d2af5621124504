pub(crate) mod costbasis_engine;
pub(crate) mod costbasis_errors;
pub(crate) mod costbasis_model;

pub use costbasis_engine::CostBasisEngine;
pub use costbasis_errors::{CostBasisError, Result};
pub use costbasis_model::{PositionSummary, RealizedGain, SellBreakdown, TaxLot};

#[cfg(test)]
pub(crate) mod tests;
