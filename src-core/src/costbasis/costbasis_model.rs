use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::transactions::PositionKey;
use crate::utils::decimal_serde::*;

pub const ROUNDING_SCALE: u32 = 8;

/// Quantities below this are dust and treated as zero.
pub fn is_quantity_significant(quantity: &Decimal) -> bool {
    let threshold = Decimal::from_str_radix(crate::constants::QUANTITY_THRESHOLD, 10)
        .unwrap_or_else(|_| Decimal::new(1, 10));
    quantity.abs() >= threshold
}

/// One acquisition, partially consumable by later sells.
///
/// `cost` includes the entry fee; the per-unit `price` is preserved across
/// partial consumption because cost and fee shrink by the same fraction as
/// quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxLot {
    pub id: String,
    pub exchange: String,
    pub asset: String,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub original_quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub price: Decimal,
    #[serde(with = "decimal_serde")]
    pub cost: Decimal,
    #[serde(with = "decimal_serde")]
    pub fee: Decimal,
    pub acquired_at: DateTime<Utc>,
}

impl TaxLot {
    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.exchange.clone(), self.asset.clone())
    }
}

/// Output of a sell that found cost basis. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealizedGain {
    pub transaction_id: u64,
    pub exchange: String,
    pub asset: String,
    #[serde(with = "decimal_serde")]
    pub quantity_sold: Decimal,
    #[serde(with = "decimal_serde")]
    pub sell_value: Decimal,
    #[serde(with = "decimal_serde")]
    pub cost_basis: Decimal,
    #[serde(with = "decimal_serde")]
    pub gross_gain: Decimal,
    /// Exit fee only; entry fees are already inside `cost_basis`.
    #[serde(with = "decimal_serde")]
    pub fees: Decimal,
    #[serde(with = "decimal_serde")]
    pub net_gain: Decimal,
    /// Quantity-weighted average age of the consumed lots, in days.
    #[serde(with = "decimal_serde")]
    pub hold_days: Decimal,
    pub lots_consumed: u32,
    pub sold_at: DateTime<Utc>,
}

impl RealizedGain {
    pub fn is_win(&self) -> bool {
        self.net_gain.is_sign_positive() && !self.net_gain.is_zero()
    }
}

/// Aggregate view of one open position, used by reconciliation and valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSummary {
    pub exchange: String,
    pub asset: String,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub cost_basis: Decimal,
    pub lot_count: usize,
}

impl PositionSummary {
    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.exchange.clone(), self.asset.clone())
    }
}

/// Full breakdown from a non-mutating sell simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellBreakdown {
    pub exchange: String,
    pub asset: String,
    #[serde(with = "decimal_serde")]
    pub requested_quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub covered_quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub sell_value: Decimal,
    #[serde(with = "decimal_serde")]
    pub estimated_fee: Decimal,
    #[serde(with = "decimal_serde")]
    pub cost_basis: Decimal,
    #[serde(with = "decimal_serde")]
    pub gross_gain: Decimal,
    #[serde(with = "decimal_serde")]
    pub net_gain: Decimal,
    pub profitable: bool,
}
