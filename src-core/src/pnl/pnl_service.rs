use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use log::debug;
use rust_decimal::Decimal;

use crate::costbasis::{PositionSummary, RealizedGain};
use crate::pnl::pnl_model::{DailyPnl, PnlSummary, UnrealizedPnl, UnrealizedPosition};
use crate::transactions::PositionKey;

/// Accumulates realized gains over time, bucketed by day.
#[derive(Debug, Default)]
pub struct PnlAggregator {
    gains: Vec<RealizedGain>,
    daily: BTreeMap<NaiveDate, DailyPnl>,
}

impl PnlAggregator {
    pub fn new() -> Self {
        PnlAggregator {
            gains: Vec::new(),
            daily: BTreeMap::new(),
        }
    }

    pub fn record_gain(&mut self, gain: &RealizedGain) {
        let date = gain.sold_at.date_naive();
        let bucket = self
            .daily
            .entry(date)
            .or_insert_with(|| DailyPnl::new(date));
        bucket.realized += gain.net_gain;
        bucket.fees += gain.fees;
        bucket.trades += 1;
        if gain.is_win() {
            bucket.wins += 1;
        } else {
            bucket.losses += 1;
        }
        self.gains.push(gain.clone());
    }

    pub fn gains(&self) -> &[RealizedGain] {
        &self.gains
    }

    pub fn daily(&self) -> Vec<DailyPnl> {
        self.daily.values().cloned().collect()
    }

    pub fn summary(&self) -> PnlSummary {
        let mut total_realized = Decimal::ZERO;
        let mut total_fees = Decimal::ZERO;
        let mut wins: u32 = 0;
        let mut losses: u32 = 0;
        for gain in &self.gains {
            total_realized += gain.net_gain;
            total_fees += gain.fees;
            if gain.is_win() {
                wins += 1;
            } else {
                losses += 1;
            }
        }
        let trade_count = wins + losses;
        let win_rate = if trade_count > 0 {
            Some(Decimal::from(wins) / Decimal::from(trade_count))
        } else {
            None
        };
        PnlSummary {
            total_realized,
            total_fees,
            trade_count,
            wins,
            losses,
            win_rate,
        }
    }

    /// Rebuilds buckets from persisted gains.
    pub fn restore_gains(&mut self, gains: Vec<RealizedGain>) {
        self.gains.clear();
        self.daily.clear();
        for gain in gains {
            self.record_gain(&gain);
        }
    }
}

/// Computes paper P&L for open positions against caller-supplied prices.
///
/// Pure function of its inputs: prices are never fetched here. Positions
/// without a supplied price are reported in `unpriced` and omitted from the
/// total rather than valued at a guess.
pub fn unrealized_pnl(
    positions: &[PositionSummary],
    prices: &HashMap<PositionKey, Decimal>,
) -> UnrealizedPnl {
    let mut valued = Vec::new();
    let mut unpriced = Vec::new();
    let mut total = Decimal::ZERO;

    for position in positions {
        let key = position.position_key();
        match prices.get(&key) {
            Some(price) => {
                let current_value = position.quantity * *price;
                let unrealized = current_value - position.cost_basis;
                total += unrealized;
                valued.push(UnrealizedPosition {
                    exchange: position.exchange.clone(),
                    asset: position.asset.clone(),
                    quantity: position.quantity,
                    cost_basis: position.cost_basis,
                    current_price: *price,
                    current_value,
                    unrealized,
                });
            }
            None => {
                debug!("No price supplied for {}. Omitting from totals.", key);
                unpriced.push(key.to_string());
            }
        }
    }

    UnrealizedPnl {
        positions: valued,
        total,
        unpriced,
    }
}
