use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::decimal_serde::*;

/// Gains and losses for one holding-period bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermBreakdown {
    #[serde(with = "decimal_serde")]
    pub gains: Decimal,
    #[serde(with = "decimal_serde")]
    pub losses: Decimal,
    #[serde(with = "decimal_serde")]
    pub net: Decimal,
    pub disposals: u32,
}

impl TermBreakdown {
    pub fn empty() -> Self {
        TermBreakdown {
            gains: Decimal::ZERO,
            losses: Decimal::ZERO,
            net: Decimal::ZERO,
            disposals: 0,
        }
    }
}

/// One flat-rate scenario applied to the taxable remainder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxEstimate {
    #[serde(with = "decimal_serde")]
    pub rate: Decimal,
    #[serde(with = "decimal_serde")]
    pub tax: Decimal,
}

/// Capital-gains breakdown for one fiscal year.
///
/// Two flat-rate estimates are returned in parallel; the true liability
/// depends on income context this engine does not model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxReport {
    pub fiscal_year: i32,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub short_term: TermBreakdown,
    pub long_term: TermBreakdown,
    #[serde(with = "decimal_serde")]
    pub net_total: Decimal,
    #[serde(with = "decimal_serde")]
    pub exemption: Decimal,
    #[serde(with = "decimal_serde")]
    pub taxable_amount: Decimal,
    pub estimate_low: TaxEstimate,
    pub estimate_high: TaxEstimate,
}
