use chrono::Utc;
use log::{debug, warn};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::constants::KNOWN_QUOTE_ASSETS;
use crate::transactions::transactions_model::{
    DepositEvent, FeeValuation, TradeEvent, TradeSide, Transaction, TransactionKind,
    WithdrawalEvent,
};

/// Splits a trading symbol into (base, quote).
///
/// Explicit separators win, then the longest known quote suffix. Malformed
/// symbols degrade to a best-effort trailing split; this never fails, so the
/// decoder never blocks ingestion.
pub fn split_symbol(symbol: &str) -> (String, String) {
    let normalized = symbol.trim().to_uppercase();

    for sep in ['/', '-', '_'] {
        if let Some((base, quote)) = normalized.split_once(sep) {
            if !base.is_empty() && !quote.is_empty() {
                return (base.to_string(), quote.to_string());
            }
        }
    }

    let mut best: Option<&str> = None;
    for quote in KNOWN_QUOTE_ASSETS.iter() {
        if normalized.len() > quote.len() && normalized.ends_with(quote) {
            if best.map_or(true, |b| quote.len() > b.len()) {
                best = Some(quote);
            }
        }
    }
    if let Some(quote) = best {
        let base = &normalized[..normalized.len() - quote.len()];
        return (base.to_string(), quote.to_string());
    }

    if normalized.len() > 3 {
        warn!(
            "Symbol '{}' has no known quote suffix. Falling back to trailing-3 split.",
            symbol
        );
        let (base, quote) = normalized.split_at(normalized.len() - 3);
        return (base.to_string(), quote.to_string());
    }

    warn!(
        "Symbol '{}' too short to split. Treating whole symbol as base with USD quote.",
        symbol
    );
    (normalized, "USD".to_string())
}

/// Normalizes raw exchange events into canonical, immutable transactions.
///
/// Owns the monotonically increasing transaction id sequence.
#[derive(Debug)]
pub struct TransactionDecoder {
    next_id: u64,
}

impl TransactionDecoder {
    pub fn new() -> Self {
        TransactionDecoder { next_id: 1 }
    }

    /// Resumes the sequence after reloading persisted books.
    pub fn resume_after(last_id: u64) -> Self {
        TransactionDecoder {
            next_id: last_id + 1,
        }
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn decode_trade(&mut self, event: &TradeEvent) -> Transaction {
        let (base_asset, quote_asset) = split_symbol(&event.symbol);
        let fee_valuation = value_fee(
            event.fee,
            &event.fee_asset,
            &base_asset,
            &quote_asset,
            event.price,
        );

        let tx = Transaction {
            id: self.take_id(),
            exchange: event.exchange.clone(),
            symbol: event.symbol.clone(),
            base_asset,
            quote_asset,
            kind: TransactionKind::Trade,
            side: Some(event.side),
            quantity: event.quantity,
            price: event.price,
            fee: event.fee,
            fee_asset: event.fee_asset.clone(),
            fee_valuation,
            order_id: event.order_id.clone(),
            is_margin: event.is_margin,
            leverage: event.leverage,
            timestamp: event.timestamp.unwrap_or_else(Utc::now),
        };
        debug!(
            "Decoded trade {}: {} {} {}@{} on {}",
            tx.id,
            event.side.as_str(),
            tx.quantity,
            tx.base_asset,
            tx.price,
            tx.exchange
        );
        tx
    }

    pub fn decode_deposit(&mut self, event: &DepositEvent) -> Transaction {
        let asset = event.asset.trim().to_uppercase();
        Transaction {
            id: self.take_id(),
            exchange: event.exchange.clone(),
            symbol: asset.clone(),
            base_asset: asset.clone(),
            quote_asset: asset.clone(),
            kind: TransactionKind::Deposit,
            side: None,
            quantity: event.quantity,
            price: Decimal::ONE,
            fee: Decimal::ZERO,
            fee_asset: asset,
            fee_valuation: FeeValuation::Priced {
                value: Decimal::ZERO,
            },
            order_id: None,
            is_margin: false,
            leverage: Decimal::ONE,
            timestamp: event.timestamp.unwrap_or_else(Utc::now),
        }
    }

    pub fn decode_withdrawal(&mut self, event: &WithdrawalEvent) -> Transaction {
        let asset = event.asset.trim().to_uppercase();
        Transaction {
            id: self.take_id(),
            exchange: event.exchange.clone(),
            symbol: asset.clone(),
            base_asset: asset.clone(),
            quote_asset: asset.clone(),
            kind: TransactionKind::Withdrawal,
            side: None,
            quantity: event.quantity,
            price: Decimal::ONE,
            fee: event.fee,
            fee_asset: asset,
            // Withdrawal fees are charged in the withdrawn asset itself.
            fee_valuation: FeeValuation::Priced { value: event.fee },
            order_id: None,
            is_margin: false,
            leverage: Decimal::ONE,
            timestamp: event.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

impl Default for TransactionDecoder {
    fn default() -> Self {
        TransactionDecoder::new()
    }
}

/// Values a trade fee in quote-currency terms.
///
/// A fee charged in an asset we cannot price against this trade is carried
/// at face value and tagged as a low-confidence estimate instead of being
/// silently assumed 1:1.
fn value_fee(
    fee: Decimal,
    fee_asset: &str,
    base_asset: &str,
    quote_asset: &str,
    price: Decimal,
) -> FeeValuation {
    if fee.is_zero() {
        return FeeValuation::Priced {
            value: Decimal::ZERO,
        };
    }
    let fee_asset = fee_asset.trim().to_uppercase();
    if fee_asset == quote_asset || fee_asset.is_empty() {
        return FeeValuation::Priced { value: fee };
    }
    if fee_asset == base_asset {
        return FeeValuation::Estimated {
            value: fee * price,
            confidence: dec!(0.9),
        };
    }
    warn!(
        "Fee asset {} matches neither base {} nor quote {}. Carrying fee at face value as a low-confidence estimate.",
        fee_asset, base_asset, quote_asset
    );
    FeeValuation::Estimated {
        value: fee,
        confidence: dec!(0.5),
    }
}
