pub(crate) mod decoder;
pub(crate) mod transactions_model;

pub use decoder::{split_symbol, TransactionDecoder};
pub use transactions_model::{
    DepositEvent, FeeValuation, PositionKey, TradeEvent, TradeSide, Transaction, TransactionKind,
    WithdrawalEvent,
};
