pub(crate) mod treasury_model;
pub(crate) mod treasury_service;

pub use treasury_model::{FinancialSummary, IngestReport};
pub use treasury_service::Treasury;

#[cfg(test)]
pub(crate) mod tests;
