mod common;

use chrono::{Duration, Utc};
use common::{rising_candles, usdt_instrument, MockExchange, RecordingNotifier};
use spotbot::config::Config;
use spotbot::engine::{Engine, SCREENING_TITLE};
use spotbot::models::{Instrument, FAILED_ORDER_ID, LEDGER_TIME_FORMAT};
use spotbot::persistence::{MemoryLedger, TradeLedger};
use spotbot::strategy::MomentumStrategy;
use std::sync::Arc;

const BULLISH_COUNT: usize = 36;

fn symbol(i: usize) -> String {
    format!("S{:02}USDT", i)
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn ago(minutes: i64) -> String {
    (Utc::now().naive_utc() - Duration::minutes(minutes))
        .format(LEDGER_TIME_FORMAT)
        .to_string()
}

fn create_test_exchange(balance: Option<f64>) -> MockExchange {
    let mut exchange = MockExchange {
        balance,
        fill_price: 100.0,
        ..MockExchange::default()
    };
    for i in 0..BULLISH_COUNT {
        let s = symbol(i);
        exchange.instruments.push(usdt_instrument(&s));
        exchange.candles.insert(s, rising_candles(300));
    }
    // neither of these is scanned
    exchange.instruments.push(Instrument {
        quote_asset: "BTC".to_string(),
        ..usdt_instrument("ETHBTC")
    });
    exchange.instruments.push(Instrument {
        status: "BREAK".to_string(),
        ..usdt_instrument("HALTUSDT")
    });
    exchange.limit_failures.insert(symbol(3));
    exchange
}

async fn create_test_ledger() -> Arc<MemoryLedger> {
    let ledger = Arc::new(MemoryLedger::new());
    let watchlist: Vec<String> = (0..BULLISH_COUNT).map(symbol).collect();
    ledger
        .seed(
            "data!A1:B4",
            vec![
                row(&["key", "value"]),
                row(&["lastAlertCoin", &watchlist.join(",")]),
                row(&["currentTotalAlertCoin", "36"]),
                row(&["previousTotalAlertCoin", "31"]),
            ],
        )
        .await;
    ledger
        .seed(
            "trading_details!A1",
            vec![
                row(&["timestamp", "pair", "buyPrice", "sellPrice"]),
                row(&[&ago(30), "S00USDT", "100", "102.00"]),
                row(&[&ago(90), "S00USDT", "100", "102.00"]),
                row(&[&ago(600), "S01USDT", "100", "102.00"]),
            ],
        )
        .await;
    ledger
        .seed(
            "all_trading!A1",
            vec![row(&[
                "timestamp", "pair", "quantity", "buyPrice", "sellPrice", "orderId", "status",
            ])],
        )
        .await;
    ledger
}

fn create_test_engine(
    exchange: Arc<MockExchange>,
    ledger: Arc<MemoryLedger>,
    notifier: Arc<RecordingNotifier>,
) -> Engine {
    Engine::new(
        exchange,
        TradeLedger::new(ledger),
        notifier,
        Arc::new(MomentumStrategy::default()),
        Config::default(),
    )
}

#[tokio::test]
async fn test_screening_cycle_trades_and_writes_back() {
    let exchange = Arc::new(create_test_exchange(Some(1020.0)));
    let ledger = create_test_ledger().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = create_test_engine(exchange.clone(), ledger.clone(), notifier.clone());

    let summary = engine.run_screening().await;

    assert!(summary.is_clean(), "unexpected errors: {:?}", summary.errors);
    assert!(summary.rejection.is_none());
    assert_eq!(summary.counter("bullish"), BULLISH_COUNT);
    assert_eq!(summary.counter("candidates"), BULLISH_COUNT);
    assert_eq!(summary.counter("trades"), 4);
    assert_eq!(summary.counter("unprotected"), 1);

    // S00 has two live entries, S01's only entry has decayed
    let buys = exchange.calls_starting_with("market_buy");
    assert_eq!(
        buys,
        vec![
            "market_buy S01USDT quote=10.000000",
            "market_buy S02USDT quote=10.000000",
            "market_buy S03USDT quote=10.000000",
            "market_buy S04USDT quote=10.000000",
        ]
    );
    let sells = exchange.calls_starting_with("limit_sell");
    assert_eq!(sells.len(), 4);
    assert!(sells.contains(&"limit_sell S02USDT 0.10000000@102.00".to_string()));

    let order_book = ledger.snapshot("all_trading").await;
    assert_eq!(order_book.len(), 5);
    let s03 = order_book
        .iter()
        .find(|r| r[1] == "S03USDT")
        .expect("S03 recorded");
    assert_eq!(s03[5], FAILED_ORDER_ID);
    let s02 = order_book
        .iter()
        .find(|r| r[1] == "S02USDT")
        .expect("S02 recorded");
    assert_eq!(s02[2], "0.10000000");
    assert_eq!(s02[3], "100");
    assert_eq!(s02[4], "102.00");
    assert_eq!(s02[5], "tp-S02USDT");
    assert_eq!(s02[6], "NEW");

    let recent = ledger.snapshot("trading_details").await;
    // header, two live S00 rows, four new trades
    assert_eq!(recent.len(), 7);
    assert_eq!(recent.iter().filter(|r| r[1] == "S00USDT").count(), 2);
    assert_eq!(recent.iter().filter(|r| r[1] == "S01USDT").count(), 1);

    let data = ledger.snapshot("data").await;
    let expected: Vec<String> = (0..BULLISH_COUNT).map(symbol).collect();
    assert_eq!(data[1][1], expected.join(","));
    assert_eq!(data[2][1], "36");
    assert_eq!(data[3][1], "36");

    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, SCREENING_TITLE);
    assert_eq!(sent[0].bullish.len(), BULLISH_COUNT);
    assert!(sent[0].bearish.is_empty());
}

#[tokio::test]
async fn test_balance_failure_skips_trading_but_not_write_back() {
    let exchange = Arc::new(create_test_exchange(None));
    let ledger = create_test_ledger().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = create_test_engine(exchange.clone(), ledger.clone(), notifier.clone());

    let summary = engine.run_screening().await;

    assert!(summary.has_errors_in("balance"));
    assert!(summary.rejection.is_some());
    assert_eq!(summary.counter("trades"), 0);
    assert!(exchange.calls_starting_with("market_").is_empty());

    // header only
    assert_eq!(ledger.snapshot("all_trading").await.len(), 1);
    // decayed row dropped, live rows kept
    assert_eq!(ledger.snapshot("trading_details").await.len(), 3);
    assert_eq!(ledger.snapshot("data").await[2][1], "36");
    assert_eq!(notifier.sent().len(), 1);
}

#[tokio::test]
async fn test_small_balance_rejects_cycle() {
    let exchange = Arc::new(create_test_exchange(Some(25.0)));
    let ledger = create_test_ledger().await;
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = create_test_engine(exchange.clone(), ledger, notifier);

    let summary = engine.run_screening().await;

    assert!(summary.is_clean());
    let rejection = summary.rejection.unwrap_or_default();
    assert!(rejection.contains("per-trade size"), "rejection was {:?}", rejection);
    assert!(exchange.calls().is_empty());
}
