use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use crate::constants::{
    ACCT_CASH, ACCT_CRYPTO_HOLDINGS, ACCT_EXCHANGE_FEES, ACCT_MARGIN_LOANS, ACCT_OWNER_CAPITAL,
    ACCT_TRADING_GAINS,
};
use crate::settings::TreasurySettings;
use crate::transactions::{DepositEvent, PositionKey, TradeEvent, TradeSide, WithdrawalEvent};
use crate::treasury::Treasury;

fn ts(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
}

fn settings() -> TreasurySettings {
    // A loose taker-fee profile keeps the fee-anomaly check quiet for the
    // deliberately chunky fees used below.
    TreasurySettings {
        initial_equity: dec!(1000),
        default_taker_fee: dec!(0.01),
        ..TreasurySettings::default()
    }
}

fn treasury(dir: &Path) -> Treasury {
    Treasury::new(settings(), dir).unwrap()
}

fn deposit(quantity: Decimal, day: u32) -> DepositEvent {
    DepositEvent {
        exchange: "kraken".to_string(),
        asset: "USDT".to_string(),
        quantity,
        timestamp: Some(ts(day)),
    }
}

fn trade(
    side: TradeSide,
    quantity: Decimal,
    price: Decimal,
    fee: Decimal,
    day: u32,
) -> TradeEvent {
    TradeEvent {
        exchange: "kraken".to_string(),
        symbol: "BTCUSDT".to_string(),
        side,
        quantity,
        price,
        fee,
        fee_asset: "USDT".to_string(),
        order_id: None,
        is_margin: false,
        leverage: dec!(1),
        timestamp: Some(ts(day)),
    }
}

fn margin_trade(
    side: TradeSide,
    quantity: Decimal,
    price: Decimal,
    fee: Decimal,
    leverage: Decimal,
    day: u32,
) -> TradeEvent {
    TradeEvent {
        is_margin: true,
        leverage,
        ..trade(side, quantity, price, fee, day)
    }
}

#[test]
fn end_to_end_deposit_buy_sell_keeps_the_books_balanced() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());

    treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();
    let buy = treasury
        .ingest_trade(&trade(TradeSide::Buy, dec!(0.01), dec!(50000), dec!(5), 2))
        .unwrap();
    assert!(buy.realized_gain.is_none());
    assert!(buy.warning.is_none());

    let sell = treasury
        .ingest_trade(&trade(TradeSide::Sell, dec!(0.01), dec!(55000), dec!(5.5), 3))
        .unwrap();
    let gain = sell.realized_gain.expect("sell must realize a gain");
    assert_eq!(gain.cost_basis, dec!(505));
    assert_eq!(gain.gross_gain, dec!(45));
    assert_eq!(gain.net_gain, dec!(39.5));

    // Cash: 1000 - 505 + (550 - 5.5)
    assert_eq!(treasury.account_balance(ACCT_CASH), dec!(1039.5));
    assert_eq!(treasury.account_balance(ACCT_CRYPTO_HOLDINGS), dec!(0));
    assert_eq!(treasury.account_balance(ACCT_EXCHANGE_FEES), dec!(5.5));
    assert_eq!(treasury.account_balance(ACCT_TRADING_GAINS), dec!(45));

    let trial = treasury.trial_balance();
    assert!(trial.balanced);
    let sheet = treasury.balance_sheet();
    assert!(sheet.equation_holds);
    assert_eq!(sheet.net_income, dec!(39.5));
}

#[test]
fn financial_summary_is_idempotent_without_new_ingestion() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());
    treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();
    treasury
        .ingest_trade(&trade(TradeSide::Buy, dec!(0.01), dec!(50000), dec!(5), 2))
        .unwrap();

    let mut prices = HashMap::new();
    prices.insert(PositionKey::new("kraken", "BTC"), dec!(52000));

    let first = treasury.get_financial_summary(&prices);
    let second = treasury.get_financial_summary(&prices);
    assert_eq!(first.snapshot.equity, second.snapshot.equity);
    assert_eq!(first.snapshot.peak_equity, second.snapshot.peak_equity);
    assert_eq!(first.snapshot.health_score, second.snapshot.health_score);
    assert_eq!(first.unrealized.total, second.unrealized.total);
    assert_eq!(first.realized.total_realized, second.realized.total_realized);
    assert_eq!(first.positions.len(), second.positions.len());
}

#[test]
fn sell_without_basis_warns_and_posts_nothing() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());
    treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();

    let report = treasury
        .ingest_trade(&trade(TradeSide::Sell, dec!(1), dec!(50000), dec!(5), 2))
        .unwrap();
    assert!(report.realized_gain.is_none());
    assert!(report.warning.is_some());

    // Only the deposit reached the ledger.
    assert_eq!(treasury.account_balance(ACCT_CASH), dec!(1000));
    assert_eq!(treasury.alerts().len(), 1);
    assert!(treasury.trial_balance().balanced);
}

#[test]
fn reconciliation_thresholds() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());
    treasury.ingest_deposit(&deposit(dec!(100000), 1)).unwrap();
    treasury
        .ingest_trade(&trade(TradeSide::Buy, dec!(1), dec!(50000), dec!(0), 2))
        .unwrap();

    let mut live = HashMap::new();
    live.insert("BTC".to_string(), dec!(1.02));
    let raised = treasury.reconcile("kraken", &live);
    assert_eq!(raised.len(), 1);

    live.insert("BTC".to_string(), dec!(1.001));
    let raised = treasury.reconcile("kraken", &live);
    assert!(raised.is_empty());
}

#[test]
fn margin_buy_and_sell_post_explicit_loan_lines() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());
    treasury.ingest_deposit(&deposit(dec!(2000), 1)).unwrap();

    treasury
        .ingest_trade(&margin_trade(
            TradeSide::Buy,
            dec!(0.02),
            dec!(50000),
            dec!(1),
            dec!(2),
            2,
        ))
        .unwrap();
    // Notional 1000 at 2x: 500 own + 1 fee from cash, 500 borrowed.
    assert_eq!(treasury.account_balance(ACCT_MARGIN_LOANS), dec!(500));
    assert_eq!(treasury.account_balance(ACCT_CASH), dec!(1499));
    assert!(treasury.trial_balance().balanced);

    treasury
        .ingest_trade(&margin_trade(
            TradeSide::Sell,
            dec!(0.02),
            dec!(60000),
            dec!(1.2),
            dec!(2),
            3,
        ))
        .unwrap();
    // Repayment is capped at the outstanding loan balance.
    assert_eq!(treasury.account_balance(ACCT_MARGIN_LOANS), dec!(0));
    assert_eq!(treasury.account_balance(ACCT_CASH), dec!(2197.8));
    assert!(treasury.trial_balance().balanced);
    assert!(treasury.balance_sheet().equation_holds);
}

#[test]
fn withdrawal_reduces_capital_and_expenses_the_fee() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());
    treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();

    treasury
        .ingest_withdrawal(&WithdrawalEvent {
            exchange: "kraken".to_string(),
            asset: "USDT".to_string(),
            quantity: dec!(100),
            fee: dec!(1),
            timestamp: Some(ts(2)),
        })
        .unwrap();

    assert_eq!(treasury.account_balance(ACCT_CASH), dec!(899));
    assert_eq!(treasury.account_balance(ACCT_OWNER_CAPITAL), dec!(900));
    assert_eq!(treasury.account_balance(ACCT_EXCHANGE_FEES), dec!(1));
    assert!(treasury.trial_balance().balanced);
}

#[test]
fn books_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let last_id;
    {
        let treasury = treasury(dir.path());
        treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();
        let report = treasury
            .ingest_trade(&trade(TradeSide::Buy, dec!(0.01), dec!(50000), dec!(5), 2))
            .unwrap();
        last_id = report.transaction_id;
    }

    let reopened = treasury(dir.path());
    assert_eq!(reopened.account_balance(ACCT_CASH), dec!(495));
    assert_eq!(reopened.transactions().len(), 2);

    // The id sequence and FIFO queues continue where they left off.
    let sell = reopened
        .ingest_trade(&trade(TradeSide::Sell, dec!(0.01), dec!(55000), dec!(5.5), 3))
        .unwrap();
    assert_eq!(sell.transaction_id, last_id + 1);
    assert_eq!(sell.realized_gain.unwrap().cost_basis, dec!(505));
}

#[test]
fn batch_defers_snapshots_until_commit() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());

    treasury.begin_batch();
    treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();
    assert!(!dir.path().join("books.json").exists());
    // The forensic trail is still written per event.
    assert!(dir.path().join("audit_trail.jsonl").exists());

    treasury.commit_batch();
    assert!(dir.path().join("books.json").exists());
    assert!(dir.path().join("ledger.json").exists());
}

#[test]
fn tax_report_flows_through_the_facade() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());
    treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();
    treasury
        .ingest_trade(&trade(TradeSide::Buy, dec!(0.01), dec!(50000), dec!(5), 2))
        .unwrap();
    treasury
        .ingest_trade(&trade(TradeSide::Sell, dec!(0.01), dec!(55000), dec!(5.5), 3))
        .unwrap();

    let report = treasury.get_tax_report(Some(2024));
    assert_eq!(report.net_total, dec!(39.5));
    assert_eq!(report.short_term.disposals, 1);
    // Under the default exemption nothing is owed.
    assert_eq!(report.taxable_amount, dec!(0));
}

#[test]
fn profitability_gate_through_the_facade() {
    let dir = TempDir::new().unwrap();
    let treasury = treasury(dir.path());
    treasury.ingest_deposit(&deposit(dec!(1000), 1)).unwrap();
    treasury
        .ingest_trade(&trade(TradeSide::Buy, dec!(5), dec!(100), dec!(0), 2))
        .unwrap();

    let key = PositionKey::new("kraken", "BTC");
    let breakdown = treasury.can_sell_profitably(&key, dec!(5), dec!(99), dec!(0.001));
    assert!(!breakdown.profitable);
    assert_eq!(breakdown.net_gain, dec!(-5.495));

    let breakdown = treasury.can_sell_profitably(&key, dec!(5), dec!(110), dec!(0.001));
    assert!(breakdown.profitable);
}
