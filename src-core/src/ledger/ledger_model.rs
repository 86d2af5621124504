use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::constants::BALANCE_TOLERANCE;
use crate::ledger::ledger_errors::{LedgerError, Result};
use crate::utils::decimal_serde::*;

/// Account class, derived from the leading digit of the account code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountClass {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountClass {
    pub fn from_code(code: u32) -> Option<Self> {
        match code / 1000 {
            1 => Some(AccountClass::Asset),
            2 => Some(AccountClass::Liability),
            3 => Some(AccountClass::Equity),
            4 => Some(AccountClass::Revenue),
            5 => Some(AccountClass::Expense),
            _ => None,
        }
    }

    /// Assets and expenses increase on debit; the rest increase on credit.
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountClass::Asset | AccountClass::Expense)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub code: u32,
    pub name: String,
    pub class: AccountClass,
}

/// One side of a posting. Amounts are non-negative; exactly one of
/// debit/credit is meaningful per line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalLine {
    pub account_code: u32,
    #[serde(with = "decimal_serde")]
    pub debit: Decimal,
    #[serde(with = "decimal_serde")]
    pub credit: Decimal,
    pub asset: Option<String>,
    pub exchange: Option<String>,
    pub memo: Option<String>,
}

impl JournalLine {
    pub fn debit(account_code: u32, amount: Decimal) -> Self {
        JournalLine {
            account_code,
            debit: amount,
            credit: Decimal::ZERO,
            asset: None,
            exchange: None,
            memo: None,
        }
    }

    pub fn credit(account_code: u32, amount: Decimal) -> Self {
        JournalLine {
            account_code,
            debit: Decimal::ZERO,
            credit: amount,
            asset: None,
            exchange: None,
            memo: None,
        }
    }

    pub fn with_asset(mut self, asset: impl Into<String>) -> Self {
        self.asset = Some(asset.into());
        self
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Balanced double-entry record. Append-only; never edited after posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    /// Reference back to the originating transaction, e.g. `tx:42`.
    pub reference: Option<String>,
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn total_debits(&self) -> Decimal {
        self.lines.iter().map(|line| line.debit).sum()
    }

    pub fn total_credits(&self) -> Decimal {
        self.lines.iter().map(|line| line.credit).sum()
    }

    /// Checks structural and balance invariants. Must pass before any
    /// balance mutation; a failing entry is rejected whole.
    pub fn validate(&self) -> Result<()> {
        if self.lines.len() < 2 {
            return Err(LedgerError::TooFewLines(self.description.clone()));
        }
        for line in &self.lines {
            if line.debit.is_sign_negative() || line.credit.is_sign_negative() {
                return Err(LedgerError::NegativeAmount(line.account_code));
            }
            if !line.debit.is_zero() && !line.credit.is_zero() {
                return Err(LedgerError::AmbiguousLine(line.account_code));
            }
        }
        let debits = self.total_debits();
        let credits = self.total_credits();
        let tolerance = Decimal::from_str(BALANCE_TOLERANCE).unwrap_or(Decimal::ZERO);
        if (debits - credits).abs() > tolerance {
            return Err(LedgerError::UnbalancedEntry {
                description: self.description.clone(),
                debits,
                credits,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalanceRow {
    pub account_code: u32,
    pub account_name: String,
    #[serde(with = "decimal_serde")]
    pub debit: Decimal,
    #[serde(with = "decimal_serde")]
    pub credit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrialBalance {
    pub rows: Vec<TrialBalanceRow>,
    #[serde(with = "decimal_serde")]
    pub total_debit: Decimal,
    #[serde(with = "decimal_serde")]
    pub total_credit: Decimal,
    pub balanced: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSheet {
    #[serde(with = "decimal_serde")]
    pub total_assets: Decimal,
    #[serde(with = "decimal_serde")]
    pub total_liabilities: Decimal,
    /// Equity including net income (revenue - expenses) rolled up.
    #[serde(with = "decimal_serde")]
    pub total_equity: Decimal,
    #[serde(with = "decimal_serde")]
    pub net_income: Decimal,
    /// Whether Assets = Liabilities + Equity holds within tolerance.
    pub equation_holds: bool,
}
