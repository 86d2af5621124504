pub mod audit;
pub mod constants;
pub mod costbasis;
pub mod errors;
pub mod ledger;
pub mod pnl;
pub mod settings;
pub mod storage;
pub mod tax;
pub mod transactions;
pub mod treasury;
pub mod utils;
pub mod valuation;

pub use errors::{Error, Result};

pub use audit::{AlertCategory, AlertSeverity, AuditAlert, Auditor};
pub use costbasis::{
    CostBasisEngine, PositionSummary, RealizedGain, SellBreakdown, TaxLot,
};
pub use ledger::{
    Account, AccountClass, BalanceSheet, JournalEntry, JournalLine, Ledger, TrialBalance,
};
pub use pnl::{unrealized_pnl, DailyPnl, PnlAggregator, PnlSummary, UnrealizedPnl};
pub use settings::{TaxSettings, TreasurySettings};
pub use storage::{AuditTrail, BooksSnapshot, LedgerSnapshot, SnapshotStore};
pub use tax::{TaxCalculator, TaxReport};
pub use transactions::{
    DepositEvent, FeeValuation, PositionKey, TradeEvent, TradeSide, Transaction,
    TransactionDecoder, TransactionKind, WithdrawalEvent,
};
pub use treasury::{FinancialSummary, IngestReport, Treasury};
pub use valuation::{HealthGrade, PortfolioSnapshot, PortfolioValuator};
