use thiserror::Error;

pub type Result<T> = std::result::Result<T, CostBasisError>;

#[derive(Error, Debug)]
pub enum CostBasisError {
    #[error("Invalid transaction for cost basis: {0}")]
    InvalidTransaction(String),

    #[error("Quantity must be positive, got {0}")]
    NonPositiveQuantity(rust_decimal::Decimal),

    #[error("Internal error: {0}")]
    Internal(String),
}
