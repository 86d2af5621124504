pub(crate) mod ledger_errors;
pub(crate) mod ledger_model;
pub(crate) mod ledger_service;

pub use ledger_errors::{LedgerError, Result};
pub use ledger_model::{
    Account, AccountClass, BalanceSheet, JournalEntry, JournalLine, TrialBalance,
    TrialBalanceRow,
};
pub use ledger_service::Ledger;
