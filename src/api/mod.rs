pub mod auth;
pub mod binance;
pub mod telegram;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Candle, Instrument, MarketOrder, OrderAmount, OrderStatus, Side, TimeInForce};

pub use auth::BinanceAuth;
pub use binance::BinanceClient;
pub use telegram::{format_signal_message, LogNotifier, Notifier, TelegramNotifier};

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("venue rejected request ({code}): {msg}")]
    Api { code: i64, msg: String },
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("request timed out after {0}s")]
    Timeout(u64),
    #[error("missing credentials: {0}")]
    Unauthenticated(&'static str),
}

pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;

/// Market-data and order source the screening and monitor cycles talk to
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Most recent `limit` candles, oldest first
    async fn get_candles(&self, symbol: &str, interval: &str, limit: usize)
        -> ExchangeResult<Vec<Candle>>;

    async fn place_market_order(
        &self,
        symbol: &str,
        side: Side,
        amount: OrderAmount,
    ) -> ExchangeResult<MarketOrder>;

    /// Returns the client order id of the resting order
    async fn place_limit_order(
        &self,
        symbol: &str,
        side: Side,
        quantity: &str,
        price: &str,
        time_in_force: TimeInForce,
    ) -> ExchangeResult<String>;

    async fn cancel_order(&self, symbol: &str, client_order_id: &str) -> ExchangeResult<()>;

    async fn get_order_status(
        &self,
        symbol: &str,
        client_order_id: &str,
    ) -> ExchangeResult<OrderStatus>;

    async fn list_instruments(&self) -> ExchangeResult<Vec<Instrument>>;

    /// Free (unlocked) balance of `asset`
    async fn get_free_balance(&self, asset: &str) -> ExchangeResult<f64>;
}
