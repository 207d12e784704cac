// Strict row codecs for the three ledger ranges. A row that does not match
// its schema produces a RowError and is skipped by the caller.

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::models::{
    OrderStatus, RecentTrade, TradeRecord, Watchlist, LEDGER_PLACEHOLDER, LEDGER_TIME_FORMAT,
};

pub const WATCHLIST_KEY: &str = "lastAlertCoin";
pub const CURRENT_TOTAL_KEY: &str = "currentTotalAlertCoin";
pub const PREVIOUS_TOTAL_KEY: &str = "previousTotalAlertCoin";

/// Columns of an `all_trading` row
pub const ORDER_BOOK_WIDTH: usize = 7;
/// Columns of a `trading_details` row
pub const RECENT_TRADE_WIDTH: usize = 4;

#[derive(Debug, Error, PartialEq)]
pub enum RowError {
    #[error("row has {got} cells, expected at least {need}")]
    TooShort { got: usize, need: usize },
    #[error("column {column} is not a number: {value:?}")]
    BadNumber { column: &'static str, value: String },
    #[error("timestamp {0:?} is not in YYYY-MM-DD HH:MM:SS form")]
    BadTimestamp(String),
    #[error("column {0} is empty")]
    Empty(&'static str),
}

fn require_width(row: &[String], need: usize) -> Result<(), RowError> {
    if row.len() < need {
        return Err(RowError::TooShort {
            got: row.len(),
            need,
        });
    }
    Ok(())
}

fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, RowError> {
    NaiveDateTime::parse_from_str(raw.trim(), LEDGER_TIME_FORMAT)
        .map_err(|_| RowError::BadTimestamp(raw.to_string()))
}

fn parse_price(raw: &str, column: &'static str) -> Result<f64, RowError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| RowError::BadNumber {
            column,
            value: raw.to_string(),
        })
}

fn require_text(raw: &str, column: &'static str) -> Result<String, RowError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(RowError::Empty(column));
    }
    Ok(value.to_string())
}

/// Decode the key/value rows of the `data` range
///
/// Unknown keys and short rows are ignored; the placeholder list decodes to
/// an empty watchlist.
pub fn decode_watchlist(rows: &[Vec<String>]) -> Watchlist {
    let mut watchlist = Watchlist::default();
    for row in rows {
        let [key, value, ..] = row.as_slice() else {
            continue;
        };
        match key.as_str() {
            WATCHLIST_KEY => {
                watchlist.symbols = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty() && *s != LEDGER_PLACEHOLDER)
                    .map(str::to_string)
                    .collect();
            }
            CURRENT_TOTAL_KEY => watchlist.current_total = value.clone(),
            PREVIOUS_TOTAL_KEY => watchlist.previous_total = value.clone(),
            _ => {}
        }
    }
    watchlist
}

/// Values for `data!B2:B4`: joined symbols, their count, the prior count
pub fn encode_watchlist(bullish: &[String], previous_total: &str) -> Vec<Vec<String>> {
    let joined = if bullish.is_empty() {
        LEDGER_PLACEHOLDER.to_string()
    } else {
        bullish.join(",")
    };
    vec![
        vec![joined],
        vec![bullish.len().to_string()],
        vec![previous_total.to_string()],
    ]
}

/// `timestamp, symbol, entry price, exit price`
pub fn decode_recent_trade(row: &[String]) -> Result<RecentTrade, RowError> {
    require_width(row, RECENT_TRADE_WIDTH)?;
    Ok(RecentTrade {
        timestamp: parse_timestamp(&row[0])?,
        symbol: require_text(&row[1], "symbol")?,
        entry_price: parse_price(&row[2], "entry price")?,
        exit_price: row[3].clone(),
    })
}

pub fn encode_recent_trade(trade: &RecentTrade) -> Vec<String> {
    vec![
        trade.timestamp.format(LEDGER_TIME_FORMAT).to_string(),
        trade.symbol.clone(),
        trade.entry_price.to_string(),
        trade.exit_price.clone(),
    ]
}

/// `timestamp, symbol, quantity, entry price, exit price, order id, status`
///
/// The quantity is kept verbatim so the placeholder survives a round trip.
pub fn decode_trade_record(row: &[String]) -> Result<TradeRecord, RowError> {
    require_width(row, ORDER_BOOK_WIDTH)?;
    Ok(TradeRecord {
        timestamp: parse_timestamp(&row[0])?,
        symbol: require_text(&row[1], "symbol")?,
        quantity: row[2].trim().to_string(),
        entry_price: parse_price(&row[3], "entry price")?,
        exit_price: row[4].clone(),
        order_id: require_text(&row[5], "order id")?,
        status: OrderStatus::parse(row[6].trim()),
    })
}

pub fn encode_trade_record(record: &TradeRecord) -> Vec<String> {
    vec![
        record.formatted_timestamp(),
        record.symbol.clone(),
        record.quantity.clone(),
        record.entry_price.to_string(),
        record.exit_price.clone(),
        record.order_id.clone(),
        record.status.to_string(),
    ]
}
