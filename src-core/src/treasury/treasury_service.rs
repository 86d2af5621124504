use std::collections::HashMap;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{error, info, warn};
use rust_decimal::Decimal;

use crate::audit::{AuditAlert, Auditor};
use crate::constants::{
    ACCT_CASH, ACCT_CRYPTO_HOLDINGS, ACCT_EXCHANGE_FEES, ACCT_MARGIN_LOANS, ACCT_OWNER_CAPITAL,
    ACCT_TRADING_GAINS, ACCT_TRADING_LOSSES,
};
use crate::costbasis::{CostBasisEngine, RealizedGain, SellBreakdown};
use crate::errors::Result;
use crate::ledger::{BalanceSheet, JournalLine, Ledger, TrialBalance};
use crate::pnl::{unrealized_pnl, PnlAggregator};
use crate::settings::TreasurySettings;
use crate::storage::{AuditTrail, BooksSnapshot, LedgerSnapshot, SnapshotStore};
use crate::tax::{TaxCalculator, TaxReport};
use crate::transactions::{
    DepositEvent, PositionKey, TradeEvent, TradeSide, Transaction, TransactionDecoder,
    WithdrawalEvent,
};
use crate::treasury::treasury_model::{FinancialSummary, IngestReport};
use crate::valuation::PortfolioValuator;

struct TreasuryState {
    decoder: TransactionDecoder,
    engine: CostBasisEngine,
    ledger: Ledger,
    pnl: PnlAggregator,
    auditor: Auditor,
    transactions: Vec<Transaction>,
    trail: AuditTrail,
    in_batch: bool,
}

/// Sole entry point for mutating the books.
///
/// One write section covers decode, lot consumption, posting, audit-trail
/// append and persistence, so a transaction is either fully applied or not
/// at all. Reads share the lock's read side. Construct one instance per
/// data directory and inject it into consumers.
pub struct Treasury {
    settings: TreasurySettings,
    tax: TaxCalculator,
    valuator: PortfolioValuator,
    store: SnapshotStore,
    state: RwLock<TreasuryState>,
}

impl Treasury {
    /// Opens the books in `data_dir`, restoring any persisted state.
    pub fn new(settings: TreasurySettings, data_dir: &Path) -> Result<Self> {
        let store = SnapshotStore::new(data_dir);
        let trail = AuditTrail::open(data_dir)?;

        let mut decoder = TransactionDecoder::new();
        let mut engine = CostBasisEngine::new();
        let mut ledger = Ledger::new();
        let mut pnl = PnlAggregator::new();
        let mut auditor = Auditor::new(settings.clone());
        let valuator = PortfolioValuator::new(settings.initial_equity);
        let mut transactions = Vec::new();

        if let Some(books) = store.load_books()? {
            decoder = TransactionDecoder::resume_after(books.last_transaction_id);
            engine.restore_lots(books.lots);
            pnl.restore_gains(books.realized_gains);
            auditor.restore_alerts(books.alerts);
            valuator.restore_peak(books.peak_equity);
            transactions = books.transactions;
            info!(
                "Restored books: {} transactions, {} realized gains",
                transactions.len(),
                pnl.gains().len()
            );
        }
        if let Some(snapshot) = store.load_ledger()? {
            ledger.restore_journal(snapshot.journal)?;
            info!("Restored ledger: {} journal entries", ledger.journal().len());
        }

        Ok(Treasury {
            tax: TaxCalculator::new(settings.tax.clone()),
            settings,
            valuator,
            store,
            state: RwLock::new(TreasuryState {
                decoder,
                engine,
                ledger,
                pnl,
                auditor,
                transactions,
                trail,
                in_batch: false,
            }),
        })
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, TreasuryState> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Treasury state lock poisoned. Continuing with inner state.");
                poisoned.into_inner()
            }
        }
    }

    fn read_state(&self) -> RwLockReadGuard<'_, TreasuryState> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Treasury state lock poisoned. Continuing with inner state.");
                poisoned.into_inner()
            }
        }
    }

    pub fn ingest_trade(&self, event: &TradeEvent) -> Result<IngestReport> {
        event.validate()?;
        let mut state = self.write_state();

        let tx = state.decoder.decode_trade(event);
        let mut warning = state
            .auditor
            .check_fee_anomaly(&tx)
            .map(|alert| alert.message);

        let realized_gain = match event.side {
            TradeSide::Buy => {
                let lot = state.engine.record_buy(&tx)?;
                post_buy(&mut state, &tx, lot.cost)?;
                None
            }
            TradeSide::Sell => match state.engine.record_sell(&tx)? {
                Some(gain) => {
                    state.pnl.record_gain(&gain);
                    post_sell(&mut state, &tx, &gain)?;
                    Some(gain)
                }
                None => {
                    // Recorded in the transaction log and trail, never in
                    // the ledger: basis is not fabricated.
                    let alert = state.auditor.flag_missing_basis(&tx);
                    warning = Some(alert.message);
                    None
                }
            },
        };

        self.finish_ingest(&mut state, tx, realized_gain, warning)
    }

    pub fn ingest_deposit(&self, event: &DepositEvent) -> Result<IngestReport> {
        event.validate()?;
        let mut state = self.write_state();

        let tx = state.decoder.decode_deposit(event);
        let lines = vec![
            JournalLine::debit(ACCT_CASH, tx.quantity).with_exchange(&tx.exchange),
            JournalLine::credit(ACCT_OWNER_CAPITAL, tx.quantity),
        ];
        state.ledger.post(
            format!("Deposit {} {} at {}", tx.quantity, tx.base_asset, tx.exchange),
            Some(format!("tx:{}", tx.id)),
            tx.timestamp,
            lines,
        )?;

        self.finish_ingest(&mut state, tx, None, None)
    }

    pub fn ingest_withdrawal(&self, event: &WithdrawalEvent) -> Result<IngestReport> {
        event.validate()?;
        let mut state = self.write_state();

        let tx = state.decoder.decode_withdrawal(event);
        let fee = tx.fee_valuation.value();
        let mut lines = vec![JournalLine::debit(ACCT_OWNER_CAPITAL, tx.quantity)];
        if !fee.is_zero() {
            lines.push(JournalLine::debit(ACCT_EXCHANGE_FEES, fee).with_exchange(&tx.exchange));
        }
        lines.push(JournalLine::credit(ACCT_CASH, tx.quantity + fee).with_exchange(&tx.exchange));
        state.ledger.post(
            format!(
                "Withdraw {} {} from {}",
                tx.quantity, tx.base_asset, tx.exchange
            ),
            Some(format!("tx:{}", tx.id)),
            tx.timestamp,
            lines,
        )?;

        self.finish_ingest(&mut state, tx, None, None)
    }

    fn finish_ingest(
        &self,
        state: &mut TreasuryState,
        tx: Transaction,
        realized_gain: Option<RealizedGain>,
        warning: Option<String>,
    ) -> Result<IngestReport> {
        if let Err(e) = state.trail.append(&tx) {
            error!("Audit trail append failed for transaction {}: {}", tx.id, e);
        }
        let transaction_id = tx.id;
        state.transactions.push(tx);
        if !state.in_batch {
            self.persist(state);
        }
        Ok(IngestReport {
            transaction_id,
            realized_gain,
            warning,
        })
    }

    /// Writes both snapshots. Failure is logged and swallowed: the
    /// in-memory books stay authoritative and ingestion never aborts on a
    /// persistence problem.
    fn persist(&self, state: &TreasuryState) {
        let books = BooksSnapshot {
            last_transaction_id: state.transactions.last().map(|t| t.id).unwrap_or(0),
            transactions: state.transactions.clone(),
            lots: state.engine.export_lots(),
            realized_gains: state.pnl.gains().to_vec(),
            alerts: state.auditor.alerts().to_vec(),
            peak_equity: self.valuator.peak_equity(),
        };
        if let Err(e) = self.store.save_books(&books) {
            error!("Books snapshot failed: {}", e);
        }
        let ledger = LedgerSnapshot {
            balances: state.ledger.balances(),
            journal: state.ledger.journal().to_vec(),
        };
        if let Err(e) = self.store.save_ledger(&ledger) {
            error!("Ledger snapshot failed: {}", e);
        }
    }

    /// Defers snapshot writes until `commit_batch`, for historical
    /// backfill. The audit trail is still appended per event.
    pub fn begin_batch(&self) {
        let mut state = self.write_state();
        state.in_batch = true;
        info!("Batch ingestion started. Snapshots deferred until commit.");
    }

    pub fn commit_batch(&self) {
        let mut state = self.write_state();
        if !state.in_batch {
            warn!("commit_batch called outside a batch");
        }
        state.in_batch = false;
        self.persist(&state);
        info!(
            "Batch committed: {} transactions on the books",
            state.transactions.len()
        );
    }

    pub fn get_financial_summary(
        &self,
        prices: &HashMap<PositionKey, Decimal>,
    ) -> FinancialSummary {
        let state = self.read_state();
        let positions = state.engine.open_positions();
        let unrealized = unrealized_pnl(&positions, prices);
        let realized = state.pnl.summary();
        let sheet = state.ledger.balance_sheet();
        let snapshot = self.valuator.snapshot(
            &sheet,
            state.ledger.balance(ACCT_CASH),
            state.ledger.balance(ACCT_CRYPTO_HOLDINGS),
            &unrealized,
            realized.win_rate,
        );
        let open_alerts = state
            .auditor
            .unresolved()
            .into_iter()
            .cloned()
            .collect();
        FinancialSummary {
            realized,
            unrealized,
            positions,
            snapshot,
            open_alerts,
        }
    }

    pub fn get_tax_report(&self, year: Option<i32>) -> TaxReport {
        let state = self.read_state();
        self.tax.report(state.pnl.gains(), year)
    }

    /// Non-mutating pre-trade check over the FIFO queues.
    pub fn can_sell_profitably(
        &self,
        key: &PositionKey,
        quantity: Decimal,
        price: Decimal,
        fee_pct: Decimal,
    ) -> SellBreakdown {
        self.read_state()
            .engine
            .simulate_sell(key, quantity, price, fee_pct)
    }

    /// Compares live exchange balances against the tracked lot quantities.
    pub fn reconcile(
        &self,
        exchange: &str,
        live_balances: &HashMap<String, Decimal>,
    ) -> Vec<AuditAlert> {
        let mut state = self.write_state();
        let tracked = state.engine.tracked_balances(exchange);
        let raised = state.auditor.reconcile(exchange, live_balances, &tracked);
        if !raised.is_empty() && !state.in_batch {
            self.persist(&state);
        }
        raised
    }

    pub fn resolve_alert(&self, alert_id: &str) -> bool {
        let mut state = self.write_state();
        let resolved = state.auditor.resolve(alert_id);
        if resolved && !state.in_batch {
            self.persist(&state);
        }
        resolved
    }

    pub fn trial_balance(&self) -> TrialBalance {
        self.read_state().ledger.trial_balance()
    }

    pub fn balance_sheet(&self) -> BalanceSheet {
        self.read_state().ledger.balance_sheet()
    }

    pub fn account_balance(&self, code: u32) -> Decimal {
        self.read_state().ledger.balance(code)
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.read_state().transactions.clone()
    }

    pub fn alerts(&self) -> Vec<AuditAlert> {
        self.read_state().auditor.alerts().to_vec()
    }

    pub fn settings(&self) -> &TreasurySettings {
        &self.settings
    }
}

fn post_buy(state: &mut TreasuryState, tx: &Transaction, cost: Decimal) -> Result<()> {
    let gross = tx.gross_value();
    let fee = tx.fee_valuation.value();
    let mut lines = vec![JournalLine::debit(ACCT_CRYPTO_HOLDINGS, cost)
        .with_asset(&tx.base_asset)
        .with_exchange(&tx.exchange)];
    if tx.is_margin && tx.leverage > Decimal::ONE {
        // Own funds cover notional/leverage plus the fee; the rest is
        // borrowed and carried as a liability, never netted away.
        let own = gross / tx.leverage;
        let borrowed = gross - own;
        lines.push(JournalLine::credit(ACCT_CASH, own + fee).with_exchange(&tx.exchange));
        lines.push(JournalLine::credit(ACCT_MARGIN_LOANS, borrowed).with_exchange(&tx.exchange));
    } else {
        lines.push(JournalLine::credit(ACCT_CASH, cost).with_exchange(&tx.exchange));
    }
    state.ledger.post(
        format!(
            "Buy {} {} @ {} on {}",
            tx.quantity, tx.base_asset, tx.price, tx.exchange
        ),
        Some(format!("tx:{}", tx.id)),
        tx.timestamp,
        lines,
    )?;
    Ok(())
}

fn post_sell(state: &mut TreasuryState, tx: &Transaction, gain: &RealizedGain) -> Result<()> {
    // Gross gain goes to revenue with the exit fee expensed separately;
    // net income across the two lines equals the realized net gain.
    let proceeds = gain.sell_value - gain.fees;
    let mut lines = vec![JournalLine::debit(ACCT_CASH, proceeds).with_exchange(&tx.exchange)];
    if !gain.fees.is_zero() {
        lines.push(JournalLine::debit(ACCT_EXCHANGE_FEES, gain.fees).with_exchange(&tx.exchange));
    }
    lines.push(
        JournalLine::credit(ACCT_CRYPTO_HOLDINGS, gain.cost_basis)
            .with_asset(&tx.base_asset)
            .with_exchange(&tx.exchange),
    );
    if gain.gross_gain.is_sign_negative() {
        lines.push(JournalLine::debit(ACCT_TRADING_LOSSES, -gain.gross_gain));
    } else if !gain.gross_gain.is_zero() {
        lines.push(JournalLine::credit(ACCT_TRADING_GAINS, gain.gross_gain));
    }
    state.ledger.post(
        format!(
            "Sell {} {} @ {} on {}",
            tx.quantity, tx.base_asset, tx.price, tx.exchange
        ),
        Some(format!("tx:{}", tx.id)),
        tx.timestamp,
        lines,
    )?;

    if tx.is_margin && tx.leverage > Decimal::ONE {
        let borrowed_share = gain.sell_value - gain.sell_value / tx.leverage;
        let outstanding = state.ledger.balance(ACCT_MARGIN_LOANS);
        let repay = borrowed_share.min(outstanding);
        if repay > Decimal::ZERO {
            state.ledger.post(
                format!("Margin repayment on {}", tx.exchange),
                Some(format!("tx:{}", tx.id)),
                tx.timestamp,
                vec![
                    JournalLine::debit(ACCT_MARGIN_LOANS, repay).with_exchange(&tx.exchange),
                    JournalLine::credit(ACCT_CASH, repay).with_exchange(&tx.exchange),
                ],
            )?;
        }
    }
    Ok(())
}
