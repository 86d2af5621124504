use thiserror::Error;

pub type Result<T> = std::result::Result<T, LedgerError>;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unbalanced journal entry '{description}': debits {debits} != credits {credits}")]
    UnbalancedEntry {
        description: String,
        debits: rust_decimal::Decimal,
        credits: rust_decimal::Decimal,
    },

    #[error("Journal entry '{0}' needs at least two lines")]
    TooFewLines(String),

    #[error("Unknown account code: {0}")]
    UnknownAccount(u32),

    #[error("Journal line for account {0} must not carry both a debit and a credit")]
    AmbiguousLine(u32),

    #[error("Journal line for account {0} must not carry negative amounts")]
    NegativeAmount(u32),
}
