// Integration tests for the FIFO cost basis engine

use crate::costbasis::CostBasisEngine;
use crate::transactions::{
    FeeValuation, PositionKey, TradeSide, Transaction, TransactionKind,
};

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn dt_utc(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap()
        .and_utc()
}

fn trade(
    id: u64,
    side: TradeSide,
    qty: Decimal,
    price: Decimal,
    fee: Decimal,
    date_str: &str,
) -> Transaction {
    Transaction {
        id,
        exchange: "kraken".to_string(),
        symbol: "BTCUSD".to_string(),
        base_asset: "BTC".to_string(),
        quote_asset: "USD".to_string(),
        kind: TransactionKind::Trade,
        side: Some(side),
        quantity: qty,
        price,
        fee,
        fee_asset: "USD".to_string(),
        fee_valuation: FeeValuation::Priced { value: fee },
        order_id: None,
        is_margin: false,
        leverage: dec!(1),
        timestamp: dt_utc(date_str),
    }
}

fn buy(id: u64, qty: Decimal, price: Decimal, fee: Decimal, date_str: &str) -> Transaction {
    trade(id, TradeSide::Buy, qty, price, fee, date_str)
}

fn sell(id: u64, qty: Decimal, price: Decimal, fee: Decimal, date_str: &str) -> Transaction {
    trade(id, TradeSide::Sell, qty, price, fee, date_str)
}

fn btc_key() -> PositionKey {
    PositionKey::new("kraken", "BTC")
}

#[test]
fn sell_consumes_oldest_lot_first() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(1), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();
    engine
        .record_buy(&buy(2, dec!(1), dec!(200), dec!(0), "2024-01-02 00:00:00"))
        .unwrap();

    let gain = engine
        .record_sell(&sell(3, dec!(1), dec!(150), dec!(0), "2024-02-01 00:00:00"))
        .unwrap()
        .expect("cost basis available");

    assert_eq!(gain.cost_basis, dec!(100));
    assert_eq!(gain.gross_gain, dec!(50));
    // The newer lot must be untouched
    assert_eq!(engine.open_cost(&btc_key()), dec!(200));
    assert_eq!(engine.open_quantity(&btc_key()), dec!(1));
}

#[test]
fn partial_consumption_preserves_per_unit_price() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(10), dec!(10), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();

    let gain = engine
        .record_sell(&sell(2, dec!(4), dec!(12), dec!(0), "2024-01-10 00:00:00"))
        .unwrap()
        .expect("cost basis available");

    assert_eq!(gain.cost_basis, dec!(40));

    let lots = engine.lots_for(&btc_key());
    assert_eq!(lots.len(), 1);
    assert_eq!(lots[0].quantity, dec!(6));
    assert_eq!(lots[0].cost, dec!(60));
    assert_eq!(lots[0].original_quantity, dec!(10));
    // Per-unit price preserved at 10
    assert_eq!(lots[0].cost / lots[0].quantity, dec!(10));
}

#[test]
fn partial_consumption_splits_entry_fee_pro_rata() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(10), dec!(10), dec!(5), "2024-01-01 00:00:00"))
        .unwrap();

    engine
        .record_sell(&sell(2, dec!(4), dec!(12), dec!(0), "2024-01-10 00:00:00"))
        .unwrap()
        .expect("cost basis available");

    let lots = engine.lots_for(&btc_key());
    assert_eq!(lots[0].fee, dec!(3)); // 5 * 6/10
    assert_eq!(lots[0].cost, dec!(63)); // (100 + 5) * 6/10
}

#[test]
fn sell_without_lots_returns_none_and_consumes_nothing() {
    let mut engine = CostBasisEngine::new();
    let outcome = engine
        .record_sell(&sell(1, dec!(1), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();
    assert!(outcome.is_none());
}

#[test]
fn oversized_sell_returns_none_without_partial_consumption() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(1), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();

    let outcome = engine
        .record_sell(&sell(2, dec!(2), dec!(100), dec!(0), "2024-01-02 00:00:00"))
        .unwrap();

    assert!(outcome.is_none());
    // The open lot must be untouched — never a fabricated zero-cost gain.
    assert_eq!(engine.open_quantity(&btc_key()), dec!(1));
    assert_eq!(engine.open_cost(&btc_key()), dec!(100));
}

#[test]
fn sell_spanning_lots_consumes_in_order_and_weights_hold_time() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(2), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();
    engine
        .record_buy(&buy(2, dec!(2), dec!(200), dec!(0), "2024-01-11 00:00:00"))
        .unwrap();

    let gain = engine
        .record_sell(&sell(3, dec!(3), dec!(150), dec!(0), "2024-01-21 00:00:00"))
        .unwrap()
        .expect("cost basis available");

    // 2 @ 100 + 1 @ 200
    assert_eq!(gain.cost_basis, dec!(400));
    assert_eq!(gain.lots_consumed, 2);
    // 2 units held 20 days, 1 unit held 10 days -> (2*20 + 1*10) / 3
    assert_eq!(gain.hold_days, dec!(16.6667));
    assert_eq!(engine.open_quantity(&btc_key()), dec!(1));
}

#[test]
fn cost_basis_is_conserved_across_any_sequence() {
    let mut engine = CostBasisEngine::new();
    let buys = [
        buy(1, dec!(2), dec!(100), dec!(1), "2024-01-01 00:00:00"),
        buy(2, dec!(3), dec!(110), dec!(2), "2024-01-02 00:00:00"),
        buy(3, dec!(1.5), dec!(95), dec!(0.5), "2024-01-03 00:00:00"),
    ];
    let mut total_buy_cost = Decimal::ZERO;
    for tx in &buys {
        let lot = engine.record_buy(tx).unwrap();
        total_buy_cost += lot.cost;
    }

    let sells = [
        sell(4, dec!(1), dec!(120), dec!(0.1), "2024-02-01 00:00:00"),
        sell(5, dec!(2.5), dec!(90), dec!(0.2), "2024-02-02 00:00:00"),
        sell(6, dec!(1.25), dec!(130), dec!(0.3), "2024-02-03 00:00:00"),
    ];
    let mut realized_basis = Decimal::ZERO;
    for tx in &sells {
        if let Some(gain) = engine.record_sell(tx).unwrap() {
            realized_basis += gain.cost_basis;
        }
    }

    let open_cost = engine.open_cost(&btc_key());
    assert_eq!(open_cost + realized_basis, total_buy_cost);
}

#[test]
fn profitability_gate_spots_a_losing_exit() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(5), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();

    let breakdown = engine.simulate_sell(&btc_key(), dec!(5), dec!(99), dec!(0.001));

    assert_eq!(breakdown.sell_value, dec!(495));
    assert_eq!(breakdown.estimated_fee, dec!(0.495));
    assert_eq!(breakdown.cost_basis, dec!(500));
    assert_eq!(breakdown.net_gain, dec!(-5.495));
    assert!(!breakdown.profitable);
}

#[test]
fn profitability_gate_passes_a_winning_exit() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(5), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();

    let breakdown = engine.simulate_sell(&btc_key(), dec!(5), dec!(110), dec!(0.001));
    assert!(breakdown.profitable);
    assert_eq!(breakdown.gross_gain, dec!(50));
}

#[test]
fn simulation_does_not_mutate_the_queue() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(5), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();

    let before = engine.lots_for(&btc_key());
    engine.simulate_sell(&btc_key(), dec!(3), dec!(120), dec!(0.001));
    let after = engine.lots_for(&btc_key());

    assert_eq!(before.len(), after.len());
    assert_eq!(before[0].quantity, after[0].quantity);
    assert_eq!(before[0].cost, after[0].cost);
}

#[test]
fn under_covered_simulation_is_never_profitable() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(1), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();

    let breakdown = engine.simulate_sell(&btc_key(), dec!(2), dec!(200), dec!(0.001));
    assert_eq!(breakdown.covered_quantity, dec!(1));
    assert!(!breakdown.profitable);
}

#[test]
fn lots_are_custody_scoped_per_exchange() {
    let mut engine = CostBasisEngine::new();
    let mut binance_buy = buy(1, dec!(1), dec!(100), dec!(0), "2024-01-01 00:00:00");
    binance_buy.exchange = "binance".to_string();
    engine.record_buy(&binance_buy).unwrap();

    // A kraken sell must not see binance lots.
    let outcome = engine
        .record_sell(&sell(2, dec!(1), dec!(150), dec!(0), "2024-01-02 00:00:00"))
        .unwrap();
    assert!(outcome.is_none());
    assert_eq!(
        engine.open_quantity(&PositionKey::new("binance", "BTC")),
        dec!(1)
    );
}

#[test]
fn export_and_restore_round_trip_preserves_fifo_order() {
    let mut engine = CostBasisEngine::new();
    engine
        .record_buy(&buy(1, dec!(1), dec!(100), dec!(0), "2024-01-01 00:00:00"))
        .unwrap();
    engine
        .record_buy(&buy(2, dec!(1), dec!(200), dec!(0), "2024-01-02 00:00:00"))
        .unwrap();

    let exported = engine.export_lots();
    let mut restored = CostBasisEngine::new();
    restored.restore_lots(exported);

    let gain = restored
        .record_sell(&sell(3, dec!(1), dec!(150), dec!(0), "2024-02-01 00:00:00"))
        .unwrap()
        .expect("cost basis available");
    assert_eq!(gain.cost_basis, dec!(100));
}
