use serde::{Deserialize, Serialize};

use crate::audit::AuditAlert;
use crate::costbasis::{PositionSummary, RealizedGain};
use crate::pnl::{PnlSummary, UnrealizedPnl};
use crate::valuation::PortfolioSnapshot;

/// Outcome of one ingested event.
///
/// `realized_gain` is present only for a sell that consumed cost basis;
/// `warning` carries the most severe audit finding raised during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub transaction_id: u64,
    pub realized_gain: Option<RealizedGain>,
    pub warning: Option<String>,
}

/// Full financial picture of the books at one moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    pub realized: PnlSummary,
    pub unrealized: UnrealizedPnl,
    pub positions: Vec<PositionSummary>,
    pub snapshot: PortfolioSnapshot,
    pub open_alerts: Vec<AuditAlert>,
}
