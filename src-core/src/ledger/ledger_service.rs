use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, error};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::constants::{
    ACCT_CASH, ACCT_CRYPTO_HOLDINGS, ACCT_EXCHANGE_FEES, ACCT_MARGIN_LOANS, ACCT_OTHER_INCOME,
    ACCT_OWNER_CAPITAL, ACCT_TRADING_GAINS, ACCT_TRADING_LOSSES, BALANCE_TOLERANCE,
};
use crate::ledger::ledger_errors::{LedgerError, Result};
use crate::ledger::ledger_model::{
    Account, AccountClass, BalanceSheet, JournalEntry, JournalLine, TrialBalance, TrialBalanceRow,
};

/// Double-entry ledger over a fixed chart of accounts.
///
/// Every posting is validated balanced before any balance mutation; the
/// journal is append-only.
#[derive(Debug)]
pub struct Ledger {
    accounts: BTreeMap<u32, Account>,
    debit_totals: BTreeMap<u32, Decimal>,
    credit_totals: BTreeMap<u32, Decimal>,
    journal: Vec<JournalEntry>,
}

fn chart_of_accounts() -> BTreeMap<u32, Account> {
    let mut accounts = BTreeMap::new();
    for (code, name) in [
        (ACCT_CASH, "Cash"),
        (ACCT_CRYPTO_HOLDINGS, "Crypto Holdings"),
        (ACCT_MARGIN_LOANS, "Margin Loans"),
        (ACCT_OWNER_CAPITAL, "Owner Capital"),
        (ACCT_TRADING_GAINS, "Trading Gains"),
        (ACCT_OTHER_INCOME, "Other Income"),
        (ACCT_EXCHANGE_FEES, "Exchange Fees"),
        (ACCT_TRADING_LOSSES, "Trading Losses"),
    ] {
        let class = AccountClass::from_code(code)
            .unwrap_or_else(|| panic!("chart of accounts carries invalid code {}", code));
        accounts.insert(
            code,
            Account {
                code,
                name: name.to_string(),
                class,
            },
        );
    }
    accounts
}

impl Ledger {
    pub fn new() -> Self {
        Ledger {
            accounts: chart_of_accounts(),
            debit_totals: BTreeMap::new(),
            credit_totals: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    pub fn account(&self, code: u32) -> Option<&Account> {
        self.accounts.get(&code)
    }

    /// Constructs and posts a balanced entry atomically.
    ///
    /// Validation runs before any mutation, so a rejected entry leaves the
    /// ledger untouched.
    pub fn post(
        &mut self,
        description: impl Into<String>,
        reference: Option<String>,
        timestamp: DateTime<Utc>,
        lines: Vec<JournalLine>,
    ) -> Result<&JournalEntry> {
        let entry = JournalEntry {
            id: Uuid::new_v4().to_string(),
            timestamp,
            description: description.into(),
            reference,
            lines,
        };

        if let Err(e) = self.validate_entry(&entry) {
            error!("Rejected journal entry '{}': {}", entry.description, e);
            return Err(e);
        }

        self.apply(&entry);
        self.journal.push(entry);
        let posted = self.journal.last().expect("entry just pushed");
        debug!(
            "Posted entry {} '{}' ({} lines)",
            posted.id,
            posted.description,
            posted.lines.len()
        );
        Ok(posted)
    }

    fn validate_entry(&self, entry: &JournalEntry) -> Result<()> {
        entry.validate()?;
        for line in &entry.lines {
            if !self.accounts.contains_key(&line.account_code) {
                return Err(LedgerError::UnknownAccount(line.account_code));
            }
        }
        Ok(())
    }

    fn apply(&mut self, entry: &JournalEntry) {
        for line in &entry.lines {
            *self
                .debit_totals
                .entry(line.account_code)
                .or_insert(Decimal::ZERO) += line.debit;
            *self
                .credit_totals
                .entry(line.account_code)
                .or_insert(Decimal::ZERO) += line.credit;
        }
    }

    /// Balance of one account in its normal direction.
    pub fn balance(&self, code: u32) -> Decimal {
        let debits = self
            .debit_totals
            .get(&code)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let credits = self
            .credit_totals
            .get(&code)
            .copied()
            .unwrap_or(Decimal::ZERO);
        match self.accounts.get(&code) {
            Some(account) if account.class.is_debit_normal() => debits - credits,
            Some(_) => credits - debits,
            None => Decimal::ZERO,
        }
    }

    /// Normal-direction balances for every account, keyed by code.
    pub fn balances(&self) -> BTreeMap<u32, Decimal> {
        self.accounts
            .keys()
            .map(|code| (*code, self.balance(*code)))
            .collect()
    }

    pub fn journal(&self) -> &[JournalEntry] {
        &self.journal
    }

    /// Sums debit/credit columns per account and checks they match.
    pub fn trial_balance(&self) -> TrialBalance {
        let mut rows = Vec::new();
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;

        for (code, account) in &self.accounts {
            let debit = self
                .debit_totals
                .get(code)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let credit = self
                .credit_totals
                .get(code)
                .copied()
                .unwrap_or(Decimal::ZERO);
            if debit.is_zero() && credit.is_zero() {
                continue;
            }
            total_debit += debit;
            total_credit += credit;
            rows.push(TrialBalanceRow {
                account_code: *code,
                account_name: account.name.clone(),
                debit,
                credit,
            });
        }

        let tolerance = Decimal::from_str(BALANCE_TOLERANCE).unwrap_or(Decimal::ZERO);
        TrialBalance {
            rows,
            total_debit,
            total_credit,
            balanced: (total_debit - total_credit).abs() <= tolerance,
        }
    }

    /// Partitions balances into the accounting equation, rolling net income
    /// (revenue - expenses) into equity.
    pub fn balance_sheet(&self) -> BalanceSheet {
        let mut assets = Decimal::ZERO;
        let mut liabilities = Decimal::ZERO;
        let mut equity = Decimal::ZERO;
        let mut revenue = Decimal::ZERO;
        let mut expenses = Decimal::ZERO;

        for (code, account) in &self.accounts {
            let balance = self.balance(*code);
            match account.class {
                AccountClass::Asset => assets += balance,
                AccountClass::Liability => liabilities += balance,
                AccountClass::Equity => equity += balance,
                AccountClass::Revenue => revenue += balance,
                AccountClass::Expense => expenses += balance,
            }
        }

        let net_income = revenue - expenses;
        let total_equity = equity + net_income;
        let tolerance = Decimal::from_str(BALANCE_TOLERANCE).unwrap_or(Decimal::ZERO);

        BalanceSheet {
            total_assets: assets,
            total_liabilities: liabilities,
            total_equity,
            net_income,
            equation_holds: (assets - (liabilities + total_equity)).abs() <= tolerance,
        }
    }

    /// Rebuilds balances by replaying a persisted journal. Every replayed
    /// entry passes the same validation as a live posting.
    pub fn restore_journal(&mut self, journal: Vec<JournalEntry>) -> Result<()> {
        self.debit_totals.clear();
        self.credit_totals.clear();
        self.journal.clear();
        for entry in journal {
            self.validate_entry(&entry)?;
            self.apply(&entry);
            self.journal.push(entry);
        }
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Ledger::new()
    }
}
