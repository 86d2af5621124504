use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::costbasis::costbasis_errors::{CostBasisError, Result};
use crate::costbasis::costbasis_model::{
    is_quantity_significant, PositionSummary, RealizedGain, SellBreakdown, TaxLot, ROUNDING_SCALE,
};
use crate::transactions::{PositionKey, TradeSide, Transaction, TransactionKind};

const SECONDS_PER_DAY: i64 = 86_400;

fn age_in_days(acquired_at: DateTime<Utc>, sold_at: DateTime<Utc>) -> Decimal {
    let seconds = (sold_at - acquired_at).num_seconds().max(0);
    Decimal::from(seconds) / Decimal::from(SECONDS_PER_DAY)
}

/// Maintains per-(exchange, asset) FIFO lot queues and realizes gains on
/// sells. Cost basis is only ever transferred from open lots into realized
/// gains, never created or destroyed.
#[derive(Debug, Default)]
pub struct CostBasisEngine {
    lots: HashMap<PositionKey, VecDeque<TaxLot>>,
}

impl CostBasisEngine {
    pub fn new() -> Self {
        CostBasisEngine {
            lots: HashMap::new(),
        }
    }

    /// Appends a new lot to the tail of the key's queue.
    /// Lot cost embeds the entry fee (quantity x price + fee).
    pub fn record_buy(&mut self, tx: &Transaction) -> Result<TaxLot> {
        if tx.kind != TransactionKind::Trade || tx.side != Some(TradeSide::Buy) {
            return Err(CostBasisError::InvalidTransaction(format!(
                "record_buy requires a buy trade, got transaction {}",
                tx.id
            )));
        }
        if !tx.quantity.is_sign_positive() || tx.quantity.is_zero() {
            return Err(CostBasisError::NonPositiveQuantity(tx.quantity));
        }

        let fee = tx.fee_valuation.value();
        let cost = (tx.quantity * tx.price + fee).round_dp(ROUNDING_SCALE);
        let lot = TaxLot {
            id: Uuid::new_v4().to_string(),
            exchange: tx.exchange.clone(),
            asset: tx.base_asset.clone(),
            quantity: tx.quantity,
            original_quantity: tx.quantity,
            price: tx.price,
            cost,
            fee: fee.round_dp(ROUNDING_SCALE),
            acquired_at: tx.timestamp,
        };

        self.lots
            .entry(tx.position_key())
            .or_default()
            .push_back(lot.clone());
        debug!(
            "Recorded lot {} for {}: qty {} cost {}",
            lot.id,
            lot.position_key(),
            lot.quantity,
            lot.cost
        );
        Ok(lot)
    }

    /// Consumes lots head-first to cover a sell.
    ///
    /// Returns `Ok(None)` when open quantity cannot cover the sale; in that
    /// case nothing is consumed. A partially consumed lot keeps its per-unit
    /// price: the fraction taken is applied to both cost and fee.
    pub fn record_sell(&mut self, tx: &Transaction) -> Result<Option<RealizedGain>> {
        if tx.kind != TransactionKind::Trade || tx.side != Some(TradeSide::Sell) {
            return Err(CostBasisError::InvalidTransaction(format!(
                "record_sell requires a sell trade, got transaction {}",
                tx.id
            )));
        }
        if !tx.quantity.is_sign_positive() || tx.quantity.is_zero() {
            return Err(CostBasisError::NonPositiveQuantity(tx.quantity));
        }

        let key = tx.position_key();
        let available = self.open_quantity(&key);
        if available < tx.quantity && !is_quantity_significant(&(available - tx.quantity)) {
            // Within dust of the requested quantity: treat as fully covered.
        } else if available < tx.quantity {
            warn!(
                "Sell of {} {} exceeds tracked {} for {}. No cost basis available; nothing consumed.",
                tx.quantity, tx.base_asset, available, key
            );
            return Ok(None);
        }

        let queue = match self.lots.get_mut(&key) {
            Some(queue) => queue,
            None => {
                warn!("Sell on untracked position {}. Nothing consumed.", key);
                return Ok(None);
            }
        };

        let mut remaining = tx.quantity;
        let mut cost_basis = Decimal::ZERO;
        let mut weighted_age = Decimal::ZERO;
        let mut quantity_taken = Decimal::ZERO;
        let mut lots_consumed: u32 = 0;

        while remaining > Decimal::ZERO {
            let lot = match queue.front_mut() {
                Some(lot) => lot,
                None => break, // availability was pre-checked; only dust can land here
            };

            let mut taken = remaining.min(lot.quantity);
            let leftover = lot.quantity - taken;
            if !is_quantity_significant(&leftover) {
                // Take the dust along so its residual cost is not stranded.
                taken = lot.quantity;
            }

            let fraction = taken / lot.quantity;
            let cost_taken = (lot.cost * fraction).round_dp(ROUNDING_SCALE);
            let fee_taken = (lot.fee * fraction).round_dp(ROUNDING_SCALE);

            cost_basis += cost_taken;
            weighted_age += taken * age_in_days(lot.acquired_at, tx.timestamp);
            quantity_taken += taken;
            lots_consumed += 1;

            if taken == lot.quantity {
                queue.pop_front();
            } else {
                lot.quantity -= taken;
                lot.cost -= cost_taken;
                lot.fee -= fee_taken;
            }

            remaining -= taken;
            if remaining < Decimal::ZERO {
                remaining = Decimal::ZERO;
            }
        }

        if queue.is_empty() {
            self.lots.remove(&key);
        }

        let exit_fee = tx.fee_valuation.value().round_dp(ROUNDING_SCALE);
        let sell_value = (tx.quantity * tx.price).round_dp(ROUNDING_SCALE);
        let gross_gain = sell_value - cost_basis;
        let net_gain = gross_gain - exit_fee;
        let hold_days = if quantity_taken.is_zero() {
            Decimal::ZERO
        } else {
            (weighted_age / quantity_taken).round_dp(4)
        };

        let gain = RealizedGain {
            transaction_id: tx.id,
            exchange: tx.exchange.clone(),
            asset: tx.base_asset.clone(),
            quantity_sold: quantity_taken.round_dp(ROUNDING_SCALE),
            sell_value,
            cost_basis: cost_basis.round_dp(ROUNDING_SCALE),
            gross_gain: gross_gain.round_dp(ROUNDING_SCALE),
            fees: exit_fee,
            net_gain: net_gain.round_dp(ROUNDING_SCALE),
            hold_days,
            lots_consumed,
            sold_at: tx.timestamp,
        };
        debug!(
            "Realized {} on {} ({} lots, basis {})",
            gain.net_gain, key, gain.lots_consumed, gain.cost_basis
        );
        Ok(Some(gain))
    }

    /// Non-mutating FIFO walk used as a pre-trade profitability check.
    ///
    /// The breakdown is computed over the covered quantity; profitability
    /// additionally requires the requested quantity to be fully covered.
    pub fn simulate_sell(
        &self,
        key: &PositionKey,
        quantity: Decimal,
        price: Decimal,
        fee_pct: Decimal,
    ) -> SellBreakdown {
        let mut remaining = quantity;
        let mut covered = Decimal::ZERO;
        let mut cost_basis = Decimal::ZERO;

        if let Some(queue) = self.lots.get(key) {
            for lot in queue {
                if remaining <= Decimal::ZERO {
                    break;
                }
                let taken = remaining.min(lot.quantity);
                let fraction = taken / lot.quantity;
                cost_basis += (lot.cost * fraction).round_dp(ROUNDING_SCALE);
                covered += taken;
                remaining -= taken;
            }
        }

        let sell_value = (covered * price).round_dp(ROUNDING_SCALE);
        let estimated_fee = (sell_value * fee_pct).round_dp(ROUNDING_SCALE);
        let gross_gain = sell_value - cost_basis;
        let net_gain = gross_gain - estimated_fee;
        let fully_covered = !is_quantity_significant(&(quantity - covered));

        SellBreakdown {
            exchange: key.exchange.clone(),
            asset: key.asset.clone(),
            requested_quantity: quantity,
            covered_quantity: covered,
            sell_value,
            estimated_fee,
            cost_basis: cost_basis.round_dp(ROUNDING_SCALE),
            gross_gain: gross_gain.round_dp(ROUNDING_SCALE),
            net_gain: net_gain.round_dp(ROUNDING_SCALE),
            profitable: fully_covered && net_gain > Decimal::ZERO,
        }
    }

    /// Total open quantity for a key.
    pub fn open_quantity(&self, key: &PositionKey) -> Decimal {
        self.lots
            .get(key)
            .map(|queue| queue.iter().map(|lot| lot.quantity).sum())
            .unwrap_or(Decimal::ZERO)
    }

    /// Total open cost for a key.
    pub fn open_cost(&self, key: &PositionKey) -> Decimal {
        self.lots
            .get(key)
            .map(|queue| queue.iter().map(|lot| lot.cost).sum())
            .unwrap_or(Decimal::ZERO)
    }

    /// Summaries for every open position, sorted by key for stable output.
    pub fn open_positions(&self) -> Vec<PositionSummary> {
        let mut keys: Vec<&PositionKey> = self.lots.keys().collect();
        keys.sort();
        keys.into_iter()
            .filter_map(|key| {
                let quantity = self.open_quantity(key);
                if !is_quantity_significant(&quantity) {
                    return None;
                }
                Some(PositionSummary {
                    exchange: key.exchange.clone(),
                    asset: key.asset.clone(),
                    quantity,
                    cost_basis: self.open_cost(key),
                    lot_count: self.lots.get(key).map(|q| q.len()).unwrap_or(0),
                })
            })
            .collect()
    }

    /// Open quantities per asset for one exchange, for reconciliation.
    pub fn tracked_balances(&self, exchange: &str) -> HashMap<String, Decimal> {
        let mut balances = HashMap::new();
        for (key, queue) in &self.lots {
            if key.exchange == exchange {
                let quantity: Decimal = queue.iter().map(|lot| lot.quantity).sum();
                balances.insert(key.asset.clone(), quantity);
            }
        }
        balances
    }

    pub fn lots_for(&self, key: &PositionKey) -> Vec<TaxLot> {
        self.lots
            .get(key)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Lot queues keyed by `"exchange:asset"`, the persisted books format.
    pub fn export_lots(&self) -> BTreeMap<String, Vec<TaxLot>> {
        self.lots
            .iter()
            .map(|(key, queue)| (key.storage_key(), queue.iter().cloned().collect()))
            .collect()
    }

    /// Rebuilds the queues from a persisted snapshot. Queue order is the
    /// persisted order, which is acquisition order.
    pub fn restore_lots(&mut self, exported: BTreeMap<String, Vec<TaxLot>>) {
        self.lots.clear();
        for (storage_key, lots) in exported {
            match PositionKey::from_storage_key(&storage_key) {
                Some(key) => {
                    self.lots.insert(key, lots.into_iter().collect());
                }
                None => {
                    warn!(
                        "Skipping malformed position key '{}' in persisted books",
                        storage_key
                    );
                }
            }
        }
    }
}
