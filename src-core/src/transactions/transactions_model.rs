use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use crate::utils::decimal_serde::*;

/// Composite key identifying one asset held at one exchange.
///
/// Custody domains are accounting-distinct: BTC at two exchanges is two keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PositionKey {
    pub exchange: String,
    pub asset: String,
}

impl PositionKey {
    pub fn new(exchange: impl Into<String>, asset: impl Into<String>) -> Self {
        PositionKey {
            exchange: exchange.into(),
            asset: asset.into(),
        }
    }

    /// The `"exchange:asset"` form used in the persisted books file.
    pub fn storage_key(&self) -> String {
        format!("{}:{}", self.exchange, self.asset)
    }

    pub fn from_storage_key(key: &str) -> Option<Self> {
        let (exchange, asset) = key.split_once(':')?;
        if exchange.is_empty() || asset.is_empty() {
            return None;
        }
        Some(PositionKey::new(exchange, asset))
    }
}

impl fmt::Display for PositionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.asset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "BUY",
            TradeSide::Sell => "SELL",
        }
    }
}

impl FromStr for TradeSide {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "BUY" => Ok(TradeSide::Buy),
            "SELL" => Ok(TradeSide::Sell),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown trade side: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionKind {
    Trade,
    Deposit,
    Withdrawal,
}

/// Normalized fee value in quote-currency terms.
///
/// `Estimated` marks values derived through the trade price or a last-resort
/// 1:1 assumption, so downstream consumers and the audit trail can tell a
/// confident valuation from a fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FeeValuation {
    Priced {
        #[serde(with = "decimal_serde")]
        value: Decimal,
    },
    Estimated {
        #[serde(with = "decimal_serde")]
        value: Decimal,
        #[serde(with = "decimal_serde")]
        confidence: Decimal,
    },
}

impl FeeValuation {
    pub fn value(&self) -> Decimal {
        match self {
            FeeValuation::Priced { value } => *value,
            FeeValuation::Estimated { value, .. } => *value,
        }
    }

    pub fn is_estimated(&self) -> bool {
        matches!(self, FeeValuation::Estimated { .. })
    }
}

/// Immutable, canonical record of one ingested event.
///
/// Created once by the decoder; never mutated or deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: u64,
    pub exchange: String,
    pub symbol: String,
    pub base_asset: String,
    pub quote_asset: String,
    pub kind: TransactionKind,
    pub side: Option<TradeSide>,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub price: Decimal,
    #[serde(with = "decimal_serde")]
    pub fee: Decimal,
    pub fee_asset: String,
    pub fee_valuation: FeeValuation,
    pub order_id: Option<String>,
    pub is_margin: bool,
    #[serde(with = "decimal_serde")]
    pub leverage: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Key of the position this transaction acts on.
    pub fn position_key(&self) -> PositionKey {
        PositionKey::new(self.exchange.clone(), self.base_asset.clone())
    }

    /// Gross value of the event in quote terms (quantity x price).
    pub fn gross_value(&self) -> Decimal {
        self.quantity * self.price
    }
}

/// Raw trade event as reported by an exchange connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEvent {
    pub exchange: String,
    pub symbol: String,
    pub side: TradeSide,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub price: Decimal,
    #[serde(with = "decimal_serde")]
    pub fee: Decimal,
    pub fee_asset: String,
    pub order_id: Option<String>,
    pub is_margin: bool,
    #[serde(with = "decimal_serde")]
    pub leverage: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
}

impl TradeEvent {
    /// Validates the raw trade data before decoding.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.exchange.trim().is_empty() {
            return Err(ValidationError::MissingField("exchange".to_string()));
        }
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::MissingField("symbol".to_string()));
        }
        if !self.quantity.is_sign_positive() || self.quantity.is_zero() {
            return Err(ValidationError::InvalidInput(format!(
                "Trade quantity must be positive, got {}",
                self.quantity
            )));
        }
        if !self.price.is_sign_positive() || self.price.is_zero() {
            return Err(ValidationError::InvalidInput(format!(
                "Trade price must be positive, got {}",
                self.price
            )));
        }
        if self.fee.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "Trade fee must not be negative, got {}",
                self.fee
            )));
        }
        if self.leverage < Decimal::ONE {
            return Err(ValidationError::InvalidInput(format!(
                "Leverage must be >= 1, got {}",
                self.leverage
            )));
        }
        Ok(())
    }
}

/// Raw deposit event (cash or asset arriving at an exchange).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositEvent {
    pub exchange: String,
    pub asset: String,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
}

impl DepositEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.exchange.trim().is_empty() {
            return Err(ValidationError::MissingField("exchange".to_string()));
        }
        if self.asset.trim().is_empty() {
            return Err(ValidationError::MissingField("asset".to_string()));
        }
        if !self.quantity.is_sign_positive() || self.quantity.is_zero() {
            return Err(ValidationError::InvalidInput(format!(
                "Deposit quantity must be positive, got {}",
                self.quantity
            )));
        }
        Ok(())
    }
}

/// Raw withdrawal event (cash or asset leaving an exchange).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalEvent {
    pub exchange: String,
    pub asset: String,
    #[serde(with = "decimal_serde")]
    pub quantity: Decimal,
    #[serde(with = "decimal_serde")]
    pub fee: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
}

impl WithdrawalEvent {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.exchange.trim().is_empty() {
            return Err(ValidationError::MissingField("exchange".to_string()));
        }
        if self.asset.trim().is_empty() {
            return Err(ValidationError::MissingField("asset".to_string()));
        }
        if !self.quantity.is_sign_positive() || self.quantity.is_zero() {
            return Err(ValidationError::InvalidInput(format!(
                "Withdrawal quantity must be positive, got {}",
                self.quantity
            )));
        }
        if self.fee.is_sign_negative() {
            return Err(ValidationError::InvalidInput(format!(
                "Withdrawal fee must not be negative, got {}",
                self.fee
            )));
        }
        Ok(())
    }
}
