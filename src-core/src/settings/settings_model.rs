use std::collections::HashMap;
use std::path::Path;

use log::info;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::utils::decimal_serde::*;

/// Fiscal-year and flat-rate parameters for the tax calculator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxSettings {
    pub fiscal_start_month: u32,
    pub fiscal_start_day: u32,
    #[serde(with = "decimal_serde")]
    pub annual_exemption: Decimal,
    #[serde(with = "decimal_serde")]
    pub rate_low: Decimal,
    #[serde(with = "decimal_serde")]
    pub rate_high: Decimal,
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            fiscal_start_month: 1,
            fiscal_start_day: 1,
            annual_exemption: dec!(1000),
            rate_low: dec!(0.15),
            rate_high: dec!(0.30),
        }
    }
}

/// Policy knobs for one treasury instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasurySettings {
    /// Equity baseline for the health score's growth signal.
    #[serde(with = "decimal_serde")]
    pub initial_equity: Decimal,
    /// Relative drift beyond which reconciliation raises a warning.
    #[serde(with = "decimal_serde")]
    pub reconcile_tolerance: Decimal,
    /// Fee anomaly threshold, as a multiple of the expected taker fee.
    #[serde(with = "decimal_serde")]
    pub fee_anomaly_multiplier: Decimal,
    /// Taker fee assumed when an exchange has no profile entry.
    #[serde(with = "decimal_serde")]
    pub default_taker_fee: Decimal,
    /// Per-exchange taker fee rates.
    pub taker_fees: HashMap<String, Decimal>,
    pub tax: TaxSettings,
}

impl Default for TreasurySettings {
    fn default() -> Self {
        TreasurySettings {
            initial_equity: Decimal::ZERO,
            reconcile_tolerance: dec!(0.01),
            fee_anomaly_multiplier: dec!(3),
            default_taker_fee: dec!(0.001),
            taker_fees: HashMap::new(),
            tax: TaxSettings::default(),
        }
    }
}

impl TreasurySettings {
    /// Expected taker fee rate for an exchange.
    pub fn taker_fee(&self, exchange: &str) -> Decimal {
        self.taker_fees
            .get(exchange)
            .copied()
            .unwrap_or(self.default_taker_fee)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&raw)?;
        info!("Loaded treasury settings from {}", path.display());
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_vec_pretty(self)?;
        crate::storage::snapshot_store::write_atomic(path, &payload)?;
        Ok(())
    }
}
