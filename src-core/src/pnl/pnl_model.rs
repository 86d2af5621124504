use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal_serde::*;

/// Realized results for one calendar day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPnl {
    pub date: NaiveDate,
    #[serde(with = "decimal_serde")]
    pub realized: Decimal,
    #[serde(with = "decimal_serde")]
    pub fees: Decimal,
    pub trades: u32,
    pub wins: u32,
    pub losses: u32,
}

impl DailyPnl {
    pub fn new(date: NaiveDate) -> Self {
        DailyPnl {
            date,
            realized: Decimal::ZERO,
            fees: Decimal::ZERO,
            trades: 0,
            wins: 0,
            losses: 0,
        }
    }
}

/// Running realized totals across the whole book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PnlSummary {
    #[serde(with = "decimal_serde")]
    pub total_realized: Decimal,
    #[serde(with = "decimal_serde")]
    pub total_fees: Decimal,
    pub trade_count: u32,
    pub wins: u32,
    pub losses: u32,
    #[serde(with = "decimal_serde_option")]
    pub win_rate: Option<Decimal>,
}

/// Paper profit/loss of one open position against a supplied price.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrealizedPosition {
    pub exchange: String,
    pub asset: String,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub cost_basis: Decimal,
    #[serde(with = "decimal_serde")]
    pub current_price: Decimal,
    #[serde(with = "decimal_serde")]
    pub current_value: Decimal,
    #[serde(with = "decimal_serde")]
    pub unrealized: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnrealizedPnl {
    pub positions: Vec<UnrealizedPosition>,
    #[serde(with = "decimal_serde")]
    pub total: Decimal,
    /// Keys of open positions left out of the totals because no price was
    /// supplied for them.
    pub unpriced: Vec<String>,
}
