pub(crate) mod tax_model;
pub(crate) mod tax_service;

pub use tax_model::{TaxEstimate, TaxReport, TermBreakdown};
pub use tax_service::TaxCalculator;
