pub(crate) mod pnl_model;
pub(crate) mod pnl_service;

pub use pnl_model::{DailyPnl, PnlSummary, UnrealizedPnl, UnrealizedPosition};
pub use pnl_service::{unrealized_pnl, PnlAggregator};
