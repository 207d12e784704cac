use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Order id recorded when the protective limit sell could not be placed
pub const FAILED_ORDER_ID: &str = "error";

/// Non-numeric placeholder the ledger uses for empty cells
pub const LEDGER_PLACEHOLDER: &str = "a";

/// Timestamp layout used in every ledger range
pub const LEDGER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One fixed-interval bar as returned by the venue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Candle {
    pub open: f64,
    pub close: f64,
    pub quote_volume: f64,
    pub close_time: DateTime<Utc>,
}

/// Tradable pair listed by the venue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    pub quote_asset: String,
    pub status: String,
    /// Minimum price increment, e.g. "0.00010000"
    pub tick_size: String,
}

impl Instrument {
    /// True when the pair is quoted in `quote_asset` and currently trading
    pub fn is_tradable(&self, quote_asset: &str) -> bool {
        self.quote_asset == quote_asset && self.status == "TRADING"
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

/// Size of a market order: spend a quote amount, or sell a base quantity
#[derive(Debug, Clone, PartialEq)]
pub enum OrderAmount {
    Quote(String),
    Base(String),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeInForce {
    GoodTillCancelled,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeInForce::GoodTillCancelled => "GTC",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Fill {
    pub price: f64,
    pub quantity: f64,
}

/// Result of an executed market order
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarketOrder {
    pub client_order_id: String,
    /// Executed base quantity exactly as the venue reported it
    pub executed_quantity: String,
    pub fills: Vec<Fill>,
}

impl MarketOrder {
    /// Plain mean of fill prices (not volume-weighted)
    pub fn average_fill_price(&self) -> Option<f64> {
        if self.fills.is_empty() {
            return None;
        }
        let total: f64 = self.fills.iter().map(|f| f.price).sum();
        Some(total / self.fills.len() as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    PendingCancel,
    Rejected,
    Expired,
    Other(String),
}

impl OrderStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "NEW" => OrderStatus::New,
            "PARTIALLY_FILLED" => OrderStatus::PartiallyFilled,
            "FILLED" => OrderStatus::Filled,
            "CANCELED" => OrderStatus::Canceled,
            "PENDING_CANCEL" => OrderStatus::PendingCancel,
            "REJECTED" => OrderStatus::Rejected,
            "EXPIRED" => OrderStatus::Expired,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyFilled => "PARTIALLY_FILLED",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Canceled => "CANCELED",
            OrderStatus::PendingCancel => "PENDING_CANCEL",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Expired => "EXPIRED",
            OrderStatus::Other(raw) => raw,
        }
    }

    /// Still resting on the book
    pub fn is_open(&self) -> bool {
        matches!(self, OrderStatus::New | OrderStatus::PartiallyFilled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry plus its protective take-profit order, as kept in the ledger
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TradeRecord {
    /// Client order id of the limit sell, or [`FAILED_ORDER_ID`]
    pub order_id: String,
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    /// Executed buy quantity as reported by the venue
    pub quantity: String,
    pub entry_price: f64,
    /// Sell price formatted to the tick precision captured at signal time
    pub exit_price: String,
    pub status: OrderStatus,
}

impl TradeRecord {
    /// Bought but without a resting protective sell
    pub fn is_unprotected(&self) -> bool {
        self.order_id == FAILED_ORDER_ID
    }

    /// Open position with a live protective order the monitor can act on
    pub fn is_monitored(&self) -> bool {
        self.status.is_open() && !self.is_unprotected()
    }

    /// Quantity usable for a market sell, `None` for placeholders
    pub fn sellable_quantity(&self) -> Option<&str> {
        match self.quantity.parse::<f64>() {
            Ok(q) if q > 0.0 => Some(self.quantity.as_str()),
            _ => None,
        }
    }

    /// Decimal places of the recorded exit price, i.e. the tick precision it
    /// was rounded to when the take-profit order was placed
    pub fn exit_price_precision(&self) -> u32 {
        self.exit_price
            .trim()
            .split_once('.')
            .map(|(_, decimals)| decimals.len() as u32)
            .unwrap_or(0)
    }

    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format(LEDGER_TIME_FORMAT).to_string()
    }
}

/// Symbols flagged bullish by the previous cycle, as stored in the ledger
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Watchlist {
    pub symbols: Vec<String>,
    /// Bullish count written by the previous cycle
    pub current_total: String,
    pub previous_total: String,
}

/// Entry still inside the re-entry window (the `trading_details` range)
#[derive(Debug, Clone, PartialEq)]
pub struct RecentTrade {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub entry_price: f64,
    pub exit_price: String,
}

impl From<&TradeRecord> for RecentTrade {
    fn from(record: &TradeRecord) -> Self {
        Self {
            timestamp: record.timestamp,
            symbol: record.symbol.clone(),
            entry_price: record.entry_price,
            exit_price: record.exit_price.clone(),
        }
    }
}

/// Open-position count per symbol within the re-entry window
///
/// Counts only ever grow while a cycle runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Blacklist {
    counts: HashMap<String, u32>,
}

impl Blacklist {
    pub fn record(&mut self, symbol: &str) {
        *self.counts.entry(symbol.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, symbol: &str) -> u32 {
        self.counts.get(symbol).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for Blacklist {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut blacklist = Blacklist::default();
        for symbol in iter {
            blacklist.record(symbol);
        }
        blacklist
    }
}
