use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal_serde::*;

/// Ordered health grades, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthGrade {
    Excellent,
    Good,
    Fair,
    Caution,
    Critical,
}

impl HealthGrade {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            HealthGrade::Excellent
        } else if score >= 0.70 {
            HealthGrade::Good
        } else if score >= 0.55 {
            HealthGrade::Fair
        } else if score >= 0.40 {
            HealthGrade::Caution
        } else {
            HealthGrade::Critical
        }
    }
}

/// Point-in-time valuation of the whole book. Only the latest snapshot is
/// authoritative; history is not persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub generated_at: DateTime<Utc>,
    #[serde(with = "decimal_serde")]
    pub equity: Decimal,
    #[serde(with = "decimal_serde")]
    pub total_assets: Decimal,
    #[serde(with = "decimal_serde")]
    pub total_liabilities: Decimal,
    #[serde(with = "decimal_serde")]
    pub cash: Decimal,
    #[serde(with = "decimal_serde")]
    pub position_value: Decimal,
    #[serde(with = "decimal_serde")]
    pub unrealized_pnl: Decimal,
    #[serde(with = "decimal_serde")]
    pub peak_equity: Decimal,
    /// Fractional drawdown from peak equity, in [0, 1].
    #[serde(with = "decimal_serde")]
    pub drawdown: Decimal,
    pub health_score: f64,
    pub health_grade: HealthGrade,
}
