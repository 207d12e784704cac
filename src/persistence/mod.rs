// Spreadsheet-backed ledger
pub mod memory;
pub mod range;
pub mod rows;
pub mod sheets;

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Blacklist, RecentTrade, TradeRecord, Watchlist};

pub use memory::MemoryLedger;
pub use range::CellRange;
pub use rows::RowError;
pub use sheets::SheetsLedger;

/// Key/value rows holding the previous cycle's bullish symbols
pub const WATCHLIST_RANGE: &str = "data!A1:B4";
pub const WATCHLIST_WRITE_RANGE: &str = "data!B2:B4";
pub const RECENT_TRADES_RANGE: &str = "trading_details!A2:ZZ";
pub const ORDER_BOOK_RANGE: &str = "all_trading!A2:ZZ";
pub const ORDER_BOOK_APPEND_RANGE: &str = "all_trading!A1";
const ORDER_BOOK_SHEET: &str = "all_trading";

/// Order book column holding the exit price
pub const EXIT_PRICE_COLUMN: &str = "E";
/// Order book column holding the order status
pub const STATUS_COLUMN: &str = "G";

/// Plain tabular cells, one inner vector per row
pub type Rows = Vec<Vec<String>>;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("ledger api error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("invalid range {0:?}")]
    Range(String),
    #[error("unexpected ledger response: {0}")]
    Decode(String),
}

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Raw range operations of the external ledger
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn read(&self, range: &str) -> LedgerResult<Rows>;

    /// Overwrite cells starting at the top-left of `range`
    async fn update(&self, range: &str, rows: Rows) -> LedgerResult<()>;

    /// Insert rows after the last populated row of the table at `range`
    async fn append(&self, range: &str, rows: Rows) -> LedgerResult<()>;

    async fn clear(&self, range: &str) -> LedgerResult<()>;
}

/// An order book entry together with its 1-based sheet row
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBookEntry {
    pub row: usize,
    pub record: TradeRecord,
}

/// Typed view of the three ledger ranges the cycles use
#[derive(Clone)]
pub struct TradeLedger {
    ledger: Arc<dyn Ledger>,
}

impl TradeLedger {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub async fn load_watchlist(&self) -> LedgerResult<Watchlist> {
        let rows = self.ledger.read(WATCHLIST_RANGE).await?;
        Ok(rows::decode_watchlist(&rows))
    }

    pub async fn save_watchlist(&self, bullish: &[String], previous_total: &str) -> LedgerResult<()> {
        self.ledger
            .update(
                WATCHLIST_WRITE_RANGE,
                rows::encode_watchlist(bullish, previous_total),
            )
            .await
    }

    /// Trades younger than `window`, plus the per-symbol blacklist they imply
    pub async fn load_recent_trades(
        &self,
        now: NaiveDateTime,
        window: Duration,
    ) -> LedgerResult<(Blacklist, Vec<RecentTrade>)> {
        let rows = self.ledger.read(RECENT_TRADES_RANGE).await?;

        let mut blacklist = Blacklist::default();
        let mut kept = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let trade = match rows::decode_recent_trade(row) {
                Ok(trade) => trade,
                Err(e) => {
                    tracing::warn!("Skipping trading_details row {}: {}", index + 2, e);
                    continue;
                }
            };
            if now - trade.timestamp < window {
                blacklist.record(&trade.symbol);
                kept.push(trade);
            }
        }

        tracing::debug!(
            "Loaded {} recent trades ({} symbols blacklisted), {} rows decayed",
            kept.len(),
            blacklist.len(),
            rows.len() - kept.len()
        );
        Ok((blacklist, kept))
    }

    /// Replace the whole recent-trade range with `trades`
    pub async fn overwrite_recent_trades(&self, trades: &[RecentTrade]) -> LedgerResult<()> {
        self.ledger.clear(RECENT_TRADES_RANGE).await?;
        if trades.is_empty() {
            return Ok(());
        }
        let rows = trades.iter().map(rows::encode_recent_trade).collect();
        self.ledger.update(RECENT_TRADES_RANGE, rows).await
    }

    pub async fn append_trades(&self, records: &[TradeRecord]) -> LedgerResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let rows = records.iter().map(rows::encode_trade_record).collect();
        self.ledger.append(ORDER_BOOK_APPEND_RANGE, rows).await
    }

    /// Every decodable order book row; malformed rows are logged and skipped
    pub async fn load_order_book(&self) -> LedgerResult<Vec<OrderBookEntry>> {
        let rows = self.ledger.read(ORDER_BOOK_RANGE).await?;
        let entries = rows
            .iter()
            .enumerate()
            .filter_map(|(index, row)| {
                let row_number = index + 2;
                match rows::decode_trade_record(row) {
                    Ok(record) => Some(OrderBookEntry {
                        row: row_number,
                        record,
                    }),
                    Err(e) => {
                        tracing::warn!("Skipping all_trading row {}: {}", row_number, e);
                        None
                    }
                }
            })
            .collect();
        Ok(entries)
    }

    /// Overwrite one order book cell, e.g. `G` of row 5
    pub async fn update_cell(&self, column: &str, row: usize, value: &str) -> LedgerResult<()> {
        let range = format!("{}!{}{}", ORDER_BOOK_SHEET, column, row);
        self.ledger
            .update(&range, vec![vec![value.to_string()]])
            .await
    }
}
