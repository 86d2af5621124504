pub(crate) mod valuation_model;
pub(crate) mod valuation_service;

pub use valuation_model::{HealthGrade, PortfolioSnapshot};
pub use valuation_service::PortfolioValuator;
