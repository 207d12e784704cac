#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use spotbot::api::{Exchange, ExchangeError, ExchangeResult, Notifier};
use spotbot::models::{
    Candle, Fill, Instrument, MarketOrder, OrderAmount, OrderStatus, Side, TimeInForce,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Candles shaped like the indicator unit tests: open 0.5 below the close
pub fn rising_candles(count: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count).map(|i| 100.0 + i as f64).collect();
    candles_from(&closes, -0.5)
}

/// Open 0.5 above the close, so every body is bearish
pub fn falling_candles(count: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..count).map(|i| 400.0 - i as f64).collect();
    candles_from(&closes, 0.5)
}

pub fn candles_from(closes: &[f64], open_offset: f64) -> Vec<Candle> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            open: close + open_offset,
            close,
            quote_volume: 1000.0,
            close_time: start + Duration::minutes(15 * (i as i64 + 1)),
        })
        .collect()
}

pub fn usdt_instrument(symbol: &str) -> Instrument {
    Instrument {
        symbol: symbol.to_string(),
        quote_asset: "USDT".to_string(),
        status: "TRADING".to_string(),
        tick_size: "0.01000000".to_string(),
    }
}

/// Scripted venue: candles per symbol, configurable failures, and a log of
/// every order-side call
#[derive(Default)]
pub struct MockExchange {
    pub instruments: Vec<Instrument>,
    pub candles: HashMap<String, Vec<Candle>>,
    /// Candle fetches for these symbols fail
    pub failing: HashSet<String>,
    /// Candle fetches for these symbols hang for five seconds
    pub slow: HashSet<String>,
    /// Limit sells for these symbols are rejected
    pub limit_failures: HashSet<String>,
    /// `None` makes the balance query fail
    pub balance: Option<f64>,
    /// Price of every market fill
    pub fill_price: f64,
    /// Known order ids; anything else fails the status query
    pub statuses: HashMap<String, OrderStatus>,
    pub calls: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub peak_in_flight: AtomicUsize,
}

impl MockExchange {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with(prefix))
            .collect()
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Exchange for MockExchange {
    async fn get_candles(
        &self,
        symbol: &str,
        _interval: &str,
        limit: usize,
    ) -> ExchangeResult<Vec<Candle>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.slow.contains(symbol) {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        }
        if self.failing.contains(symbol) {
            return Err(ExchangeError::Api {
                code: -1121,
                msg: "Invalid symbol.".to_string(),
            });
        }
        let candles = self
            .candles
            .get(symbol)
            .ok_or_else(|| ExchangeError::NotFound(symbol.to_string()))?;
        let start = candles.len().saturating_sub(limit);
        Ok(candles[start..].to_vec())
    }

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: OrderAmount,
    ) -> ExchangeResult<MarketOrder> {
        let (quantity, logged) = match &amount {
            OrderAmount::Quote(quote) => ("0.10000000".to_string(), format!("quote={}", quote)),
            OrderAmount::Base(base) => (base.clone(), format!("base={}", base)),
        };
        self.log(format!("market_{} {} {}", side.as_str().to_lowercase(), symbol, logged));

        Ok(MarketOrder {
            client_order_id: format!("mkt-{}", symbol),
            executed_quantity: quantity,
            fills: vec![Fill {
                price: self.fill_price,
                quantity: 0.1,
            }],
        })
    }

    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: &str,
        price: &str,
        _time_in_force: TimeInForce,
    ) -> ExchangeResult<String> {
        self.log(format!(
            "limit_{} {} {}@{}",
            side.as_str().to_lowercase(),
            symbol,
            quantity,
            price
        ));
        if self.limit_failures.contains(symbol) {
            return Err(ExchangeError::Api {
                code: -1013,
                msg: "Filter failure: PRICE_FILTER".to_string(),
            });
        }
        Ok(format!("tp-{}", symbol))
    }

    async fn cancel_order(&self, symbol: &str, client_order_id: &str) -> ExchangeResult<()> {
        self.log(format!("cancel {} {}", symbol, client_order_id));
        Ok(())
    }

    async fn get_order_status(
        &self,
        _symbol: &str,
        client_order_id: &str,
    ) -> ExchangeResult<OrderStatus> {
        self.statuses
            .get(client_order_id)
            .cloned()
            .ok_or_else(|| ExchangeError::NotFound(format!("order {}", client_order_id)))
    }

    async fn list_instruments(&self) -> ExchangeResult<Vec<Instrument>> {
        Ok(self.instruments.clone())
    }

    async fn get_free_balance(&self, _asset: &str) -> ExchangeResult<f64> {
        self.balance.ok_or(ExchangeError::Timeout(10))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub bullish: Vec<String>,
    pub bearish: Vec<String>,
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        title: &str,
        bullish: &[String],
        bearish: &[String],
    ) -> spotbot::Result<()> {
        self.sent.lock().unwrap().push(Notification {
            title: title.to_string(),
            bullish: bullish.to_vec(),
            bearish: bearish.to_vec(),
        });
        Ok(())
    }
}
