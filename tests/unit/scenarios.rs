/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 1/8/24
******************************************************************************/

//! End-to-end scenarios driven through the broker façade: the same six
//! walkthroughs a paper-trading engine's integration suite would run against
//! a fixed quote book, plus the universal invariants every committed account
//! must satisfy.

use chrono::{DateTime, TimeZone, Utc};
use paperbroker::EngineError;
use paperbroker::broker::{AccountStore, Broker, InMemoryAccountStore};
use paperbroker::execution::{ExecutionOutcome, QuoteSource};
use paperbroker::model::asset::asset_for;
use paperbroker::model::order::{Leg, MultiLegOrder, OrderCondition, OrderType};
use paperbroker::model::position::Position;
use paperbroker::model::quote::Quote;
use paperbroker::pricing::Estimator;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct FixedQuotes(Mutex<HashMap<String, Quote>>);

impl FixedQuotes {
    fn new() -> Self {
        FixedQuotes(Mutex::new(HashMap::new()))
    }

    fn with(pairs: Vec<(&str, Quote)>) -> Arc<Self> {
        let store = FixedQuotes::new();
        for (symbol, quote) in pairs {
            store.set(symbol, quote);
        }
        Arc::new(store)
    }

    fn set(&self, symbol: &str, quote: Quote) {
        self.0.lock().unwrap().insert(symbol.to_string(), quote);
    }
}

impl QuoteSource for FixedQuotes {
    fn quote(&self, symbol: &str) -> Option<Quote> {
        self.0.lock().unwrap().get(symbol).cloned()
    }
}

fn stock_quote(symbol: &str, bid: Decimal, ask: Decimal, last: Decimal, at: DateTime<Utc>) -> Quote {
    Quote::new(
        asset_for(symbol).unwrap(),
        at.naive_utc(),
        Some(bid),
        Some(ask),
        Some(last),
        Some(1000),
        Some(1000),
        None,
        None,
        dec!(0.05),
        None,
    )
}

fn option_quote(symbol: &str, bid: Decimal, ask: Decimal, last: Decimal, underlying: Decimal, at: DateTime<Utc>) -> Quote {
    Quote::new(
        asset_for(symbol).unwrap(),
        at.naive_utc(),
        Some(bid),
        Some(ask),
        Some(last),
        Some(10),
        Some(10),
        None,
        Some(underlying),
        dec!(0.05),
        Some(dec!(0.25)),
    )
}

fn underlying_only_quote(symbol: &str, last: Decimal, at: DateTime<Utc>) -> Quote {
    Quote::new(asset_for(symbol).unwrap(), at.naive_utc(), None, None, Some(last), None, None, None, None, dec!(0.05), None)
}

fn feb11() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 11, 10, 0, 0).unwrap()
}

fn feb21() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 2, 21, 16, 0, 0).unwrap()
}

fn market_order(symbol: &str, quantity: i64, order_type: OrderType) -> MultiLegOrder {
    MultiLegOrder::single(Leg::market(asset_for(symbol).unwrap(), quantity, order_type), OrderCondition::Market, None)
}

/// Seeds `store` with an account carrying one pre-opened position, bypassing
/// the broker so the test doesn't need a deposit operation the façade
/// doesn't expose.
async fn seed_account_with_position(
    store: &InMemoryAccountStore,
    account_id: &str,
    cash: Decimal,
    symbol: &str,
    quantity: i64,
    avg_price: Decimal,
    opened_at: DateTime<Utc>,
) {
    let mut account = paperbroker::Account::new(account_id, "alice", cash, opened_at);
    account.positions.insert(symbol.to_string(), Position::open(asset_for(symbol).unwrap(), quantity, avg_price, opened_at));
    store.save(&account).await.unwrap();
}

/// Scenario 1: an undercapitalised buy is rejected without mutating the
/// account; a fully funded account then buys and sells the same stock flat.
#[tokio::test]
async fn scenario_simple_buy_then_sell_stock() {
    let quotes = FixedQuotes::with(vec![("AAPL", stock_quote("AAPL", dec!(149.50), dec!(150.50), dec!(150.00), feb11()))]);
    let broker = Broker::new(Arc::new(InMemoryAccountStore::new()), quotes, Estimator::Midpoint);

    broker.create_account("short", "alice", dec!(10000.0), feb11()).await.unwrap();
    let before = broker.load_account("short").await.unwrap();
    let err = broker
        .submit_order("short", &market_order("AAPL", 100, OrderType::Buy), feb11())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientCash { required, available }
        if required == dec!(15000.0) && available == dec!(10000.0)));
    assert_eq!(broker.load_account("short").await.unwrap(), before);

    broker.create_account("funded", "alice", dec!(20000.0), feb11()).await.unwrap();
    let outcome = broker
        .submit_order("funded", &market_order("AAPL", 100, OrderType::Buy), feb11())
        .await
        .unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Filled { .. }));
    let account = broker.load_account("funded").await.unwrap();
    assert_eq!(account.cash_balance, dec!(5000.0));
    assert_eq!(account.positions.get("AAPL").unwrap().quantity, 100);

    let outcome = broker
        .submit_order("funded", &market_order("AAPL", -100, OrderType::Sell), feb11())
        .await
        .unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Filled { .. }));
    let account = broker.load_account("funded").await.unwrap();
    assert_eq!(account.cash_balance, dec!(20000.0));
    assert!(account.positions.is_empty());
}

/// Scenario 2: a limit order whose net limit the estimated price cannot
/// satisfy fills nothing and leaves the account untouched.
#[tokio::test]
async fn scenario_limit_order_not_filled() {
    let quotes = FixedQuotes::with(vec![("AAPL", stock_quote("AAPL", dec!(149.50), dec!(150.50), dec!(150.00), feb11()))]);
    let broker = Broker::new(Arc::new(InMemoryAccountStore::new()), quotes, Estimator::Midpoint);
    broker.create_account("A", "alice", dec!(20000.0), feb11()).await.unwrap();

    let order = MultiLegOrder::single(
        Leg::market(asset_for("AAPL").unwrap(), 100, OrderType::Buy),
        OrderCondition::Limit,
        Some(dec!(14000.0)),
    );
    let before = broker.load_account("A").await.unwrap();
    let outcome = broker.submit_order("A", &order, feb11()).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::NotFilled { .. }));
    assert_eq!(broker.load_account("A").await.unwrap(), before);
}

/// Scenario 3: buying stock and writing a call in one multi-leg order is
/// recognised as a covered call requiring no margin.
#[tokio::test]
async fn scenario_covered_call_round_trip() {
    let option_symbol = "AAPL250221C00160000";
    let quotes = FixedQuotes::with(vec![
        ("AAPL", stock_quote("AAPL", dec!(149.50), dec!(150.50), dec!(150.00), feb11())),
        (option_symbol, option_quote(option_symbol, dec!(2.90), dec!(3.10), dec!(3.00), dec!(150.00), feb11())),
    ]);
    let broker = Broker::new(Arc::new(InMemoryAccountStore::new()), quotes, Estimator::Midpoint);
    broker.create_account("A", "alice", dec!(30000.0), feb11()).await.unwrap();

    let order = MultiLegOrder::new(
        vec![
            Leg::market(asset_for("AAPL").unwrap(), 100, OrderType::Buy),
            Leg::market(asset_for(option_symbol).unwrap(), -1, OrderType::SellToOpen),
        ],
        OrderCondition::Market,
        None,
    );
    let outcome = broker.submit_order("A", &order, feb11()).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Filled { .. }));

    let account = broker.load_account("A").await.unwrap();
    assert_eq!(account.cash_balance, dec!(15300.0));
    assert_eq!(account.positions.get("AAPL").unwrap().quantity, 100);
    assert_eq!(account.positions.get(option_symbol).unwrap().quantity, -1);

    let summary = broker.account_summary("A").await.unwrap();
    assert_eq!(summary.strategies.len(), 1);
    assert_eq!(summary.strategies[0].kind_name(), "CoveredCall");
    assert_eq!(summary.maintenance_margin, Decimal::ZERO);
}

/// Scenario 4: a call credit spread's margin is the width minus the net
/// credit received, and the funded account can carry it.
#[tokio::test]
async fn scenario_vertical_credit_spread_margin() {
    let short_symbol = "AAPL250221C00150000";
    let long_symbol = "AAPL250221C00155000";
    let quotes = FixedQuotes::with(vec![
        (short_symbol, option_quote(short_symbol, dec!(4.90), dec!(5.10), dec!(5.00), dec!(150.00), feb11())),
        (long_symbol, option_quote(long_symbol, dec!(2.90), dec!(3.10), dec!(3.00), dec!(150.00), feb11())),
    ]);
    let broker = Broker::new(Arc::new(InMemoryAccountStore::new()), quotes, Estimator::Midpoint);
    broker.create_account("A", "alice", dec!(2000.0), feb11()).await.unwrap();

    let order = MultiLegOrder::new(
        vec![
            Leg::market(asset_for(short_symbol).unwrap(), -1, OrderType::SellToOpen),
            Leg::market(asset_for(long_symbol).unwrap(), 1, OrderType::BuyToOpen),
        ],
        OrderCondition::Market,
        None,
    );
    let outcome = broker.submit_order("A", &order, feb11()).await.unwrap();
    assert!(matches!(outcome, ExecutionOutcome::Filled { .. }));

    let account = broker.load_account("A").await.unwrap();
    assert_eq!(account.cash_balance, dec!(2200.0));

    let summary = broker.account_summary("A").await.unwrap();
    assert_eq!(summary.strategies.len(), 1);
    assert_eq!(summary.strategies[0].kind_name(), "VerticalCallSpread");
    assert_eq!(summary.maintenance_margin, dec!(300.0));
    assert!(account.cash_balance >= summary.maintenance_margin);
}

/// Scenario 5: a long call expiring in the money exercises into long stock;
/// an undercapitalised account fails with `InsufficientCash` and is left
/// unchanged, a funded one settles cleanly.
#[tokio::test]
async fn scenario_long_call_expires_itm() {
    let option_symbol = "AAPL250221C00150000";
    let quotes = FixedQuotes::with(vec![("AAPL", underlying_only_quote("AAPL", dec!(160.00), feb21()))]);
    let store = Arc::new(InMemoryAccountStore::new());

    seed_account_with_position(&store, "thin", dec!(1000.0), option_symbol, 1, dec!(4.0), feb11()).await;
    seed_account_with_position(&store, "funded", dec!(20000.0), option_symbol, 1, dec!(4.0), feb11()).await;

    let broker = Broker::new(store, quotes, Estimator::Midpoint);

    let before = broker.load_account("thin").await.unwrap();
    let err = broker.run_expirations("thin", feb21()).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientCash { required, available }
        if required == dec!(15000.0) && available == dec!(1000.0)));
    assert_eq!(broker.load_account("thin").await.unwrap(), before);

    let result = broker.run_expirations("funded", feb21()).await.unwrap();
    assert_eq!(result.events.len(), 1);
    let account = broker.load_account("funded").await.unwrap();
    assert_eq!(account.cash_balance, dec!(5000.0));
    assert_eq!(account.positions.get("AAPL").unwrap().quantity, 100);
    assert!(!account.positions.contains_key(option_symbol));
}

/// Scenario 6: a short put assigned in the money turns into long stock with
/// no margin requirement.
#[tokio::test]
async fn scenario_short_put_assigned() {
    let option_symbol = "AAPL250221P00145000";
    let quotes = FixedQuotes::with(vec![("AAPL", underlying_only_quote("AAPL", dec!(140.00), feb21()))]);
    let store = Arc::new(InMemoryAccountStore::new());
    seed_account_with_position(&store, "A", dec!(20000.0), option_symbol, -1, dec!(2.0), feb11()).await;

    let broker = Broker::new(store, quotes, Estimator::Midpoint);
    let result = broker.run_expirations("A", feb21()).await.unwrap();
    assert_eq!(result.events.len(), 1);

    let account = broker.load_account("A").await.unwrap();
    assert_eq!(account.cash_balance, dec!(5500.0));
    assert_eq!(account.positions.get("AAPL").unwrap().quantity, 100);
    assert!(!account.positions.contains_key(option_symbol));

    let summary = broker.account_summary("A").await.unwrap();
    assert_eq!(summary.strategies.len(), 1);
    assert_eq!(summary.strategies[0].kind_name(), "LongStock");
    assert_eq!(summary.maintenance_margin, Decimal::ZERO);
}

/// Universal invariant: a failed execution leaves `load` returning the
/// exact pre-call snapshot (spec'd as "bytewise-equal state").
#[tokio::test]
async fn failed_execution_leaves_account_byte_for_byte_unchanged() {
    let quotes = FixedQuotes::with(vec![("AAPL", stock_quote("AAPL", dec!(149.50), dec!(150.50), dec!(150.00), feb11()))]);
    let broker = Broker::new(Arc::new(InMemoryAccountStore::new()), quotes, Estimator::Midpoint);
    broker.create_account("A", "alice", dec!(100.0), feb11()).await.unwrap();

    let before = broker.load_account("A").await.unwrap();
    let _ = broker
        .submit_order("A", &market_order("AAPL", 100, OrderType::Buy), feb11())
        .await
        .unwrap_err();
    let after = broker.load_account("A").await.unwrap();
    assert_eq!(before, after);
}

/// Universal invariant: every committed position has a non-zero quantity
/// and the map has exactly one entry per distinct symbol.
#[tokio::test]
async fn committed_positions_are_never_zero_quantity_or_duplicated() {
    let quotes = FixedQuotes::with(vec![("AAPL", stock_quote("AAPL", dec!(149.50), dec!(150.50), dec!(150.00), feb11()))]);
    let broker = Broker::new(Arc::new(InMemoryAccountStore::new()), quotes, Estimator::Midpoint);
    broker.create_account("A", "alice", dec!(20000.0), feb11()).await.unwrap();

    broker
        .submit_order("A", &market_order("AAPL", 100, OrderType::Buy), feb11())
        .await
        .unwrap();
    broker
        .submit_order("A", &market_order("AAPL", -100, OrderType::SellToClose), feb11())
        .await
        .unwrap();

    let positions = broker.positions("A").await.unwrap();
    assert!(positions.iter().all(|p| p.quantity != 0));
    let symbols: std::collections::HashSet<_> = positions.iter().map(|p| p.asset.symbol()).collect();
    assert_eq!(symbols.len(), positions.len());
}
