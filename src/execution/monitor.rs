use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use super::fan_out::fan_out;
use crate::api::Exchange;
use crate::indicators::format_price;
use crate::models::{OrderAmount, OrderStatus, Side};
use crate::persistence::{
    LedgerResult, OrderBookEntry, TradeLedger, EXIT_PRICE_COLUMN, STATUS_COLUMN,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Live price below `entry * stop_loss_multiplier` liquidates the position
    pub stop_loss_multiplier: f64,
    pub max_in_flight: usize,
    pub interval: String,
    pub fetch_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            stop_loss_multiplier: 0.98,
            max_in_flight: 20,
            interval: "15m".to_string(),
            fetch_timeout_secs: 15,
        }
    }
}

/// Strictly below the threshold triggers
pub fn should_stop_out(entry_price: f64, live_price: f64, multiplier: f64) -> bool {
    live_price < entry_price * multiplier
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatusRefreshReport {
    pub checked: usize,
    /// Records whose status query failed and were reset to NEW
    pub reset: usize,
    pub write_failures: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StopLossReport {
    pub checked: usize,
    /// Symbols without a live price; never sold
    pub unpriced: Vec<String>,
    pub liquidated: Vec<String>,
    /// Triggered but not sellable (placeholder or non-positive quantity)
    pub unsellable: Vec<String>,
    pub failures: Vec<(String, String)>,
}

/// Reconciles ledger positions against the venue
pub struct PositionMonitor {
    exchange: Arc<dyn Exchange>,
    ledger: TradeLedger,
    config: MonitorConfig,
}

impl PositionMonitor {
    pub fn new(exchange: Arc<dyn Exchange>, ledger: TradeLedger, config: MonitorConfig) -> Self {
        Self {
            exchange,
            ledger,
            config,
        }
    }

    async fn open_positions(&self) -> LedgerResult<Vec<OrderBookEntry>> {
        let entries = self.ledger.load_order_book().await?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.record.is_monitored())
            .collect())
    }

    /// Query each open order and write its status back to column G
    pub async fn refresh_order_status(&self) -> LedgerResult<StatusRefreshReport> {
        let open = self.open_positions().await?;
        let mut report = StatusRefreshReport::default();

        for entry in open {
            let record = &entry.record;
            report.checked += 1;

            let status = match self
                .exchange
                .get_order_status(&record.symbol, &record.order_id)
                .await
            {
                Ok(status) => status,
                Err(e) => {
                    tracing::warn!(
                        symbol = %record.symbol,
                        order_id = %record.order_id,
                        "Status query failed, keeping order open: {}",
                        e
                    );
                    report.reset += 1;
                    OrderStatus::New
                }
            };

            if let Err(e) = self
                .ledger
                .update_cell(STATUS_COLUMN, entry.row, status.as_str())
                .await
            {
                tracing::warn!(symbol = %record.symbol, row = entry.row, "Status write failed: {}", e);
                report.write_failures.push(record.symbol.clone());
            }
        }

        tracing::info!(
            "Status refresh: {} checked, {} reset to NEW, {} write failures",
            report.checked,
            report.reset,
            report.write_failures.len()
        );
        Ok(report)
    }

    /// Latest close per symbol; symbols whose fetch failed are absent
    async fn live_prices(&self, symbols: Vec<String>) -> HashMap<String, f64> {
        let fetch_timeout = self.config.fetch_timeout_secs;
        let results = fan_out(symbols, self.config.max_in_flight, |symbol| {
            let exchange = self.exchange.clone();
            let interval = self.config.interval.clone();
            async move {
                let fetched = tokio::time::timeout(
                    Duration::from_secs(fetch_timeout),
                    exchange.get_candles(&symbol, &interval, 1),
                )
                .await;
                match fetched {
                    Ok(Ok(candles)) => candles.last().map(|c| c.close),
                    Ok(Err(e)) => {
                        tracing::warn!(symbol = %symbol, "Price fetch failed: {}", e);
                        None
                    }
                    Err(_) => {
                        tracing::warn!(symbol = %symbol, "Price fetch timed out");
                        None
                    }
                }
            }
        })
        .await;

        results
            .completed
            .into_iter()
            .filter_map(|(symbol, price)| price.map(|p| (symbol, p)))
            .collect()
    }

    /// Replace the take-profit order with a market sell for every position
    /// trading below its stop level
    pub async fn check_stop_loss(&self) -> LedgerResult<StopLossReport> {
        let open = self.open_positions().await?;
        let symbols: Vec<String> = open
            .iter()
            .map(|entry| entry.record.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let prices = self.live_prices(symbols).await;

        let mut report = StopLossReport::default();
        for entry in open {
            let record = &entry.record;
            report.checked += 1;

            let Some(&live_price) = prices.get(&record.symbol) else {
                report.unpriced.push(record.symbol.clone());
                continue;
            };
            if !should_stop_out(record.entry_price, live_price, self.config.stop_loss_multiplier) {
                continue;
            }
            tracing::info!(
                symbol = %record.symbol,
                entry_price = record.entry_price,
                live_price,
                "Stop-loss triggered"
            );

            let Some(quantity) = record.sellable_quantity() else {
                tracing::warn!(symbol = %record.symbol, quantity = %record.quantity, "Cannot sell placeholder quantity");
                report.unsellable.push(record.symbol.clone());
                continue;
            };

            if let Err(e) = self
                .exchange
                .cancel_order(&record.symbol, &record.order_id)
                .await
            {
                tracing::error!(symbol = %record.symbol, "Cancel failed: {}", e);
                report
                    .failures
                    .push((record.symbol.clone(), format!("cancel: {}", e)));
                continue;
            }

            let sell = match self
                .exchange
                .place_market_order(&record.symbol, Side::Sell, OrderAmount::Base(quantity.to_string()))
                .await
            {
                Ok(sell) => sell,
                Err(e) => {
                    tracing::error!(symbol = %record.symbol, "Market sell failed: {}", e);
                    report
                        .failures
                        .push((record.symbol.clone(), format!("market sell: {}", e)));
                    continue;
                }
            };

            report.liquidated.push(record.symbol.clone());
            tracing::info!(symbol = %record.symbol, sell_order = %sell.client_order_id, "Position liquidated");

            // The take-profit order is gone; a closed status keeps later
            // sweeps from cancelling it again.
            let mut writes = vec![(STATUS_COLUMN, OrderStatus::Canceled.as_str().to_string())];
            match sell.average_fill_price() {
                Some(exit_price) => writes.push((
                    EXIT_PRICE_COLUMN,
                    format_price(exit_price, record.exit_price_precision()),
                )),
                None => tracing::warn!(symbol = %record.symbol, "Market sell reported no fills"),
            }
            for (column, value) in writes {
                if let Err(e) = self.ledger.update_cell(column, entry.row, &value).await {
                    tracing::warn!(symbol = %record.symbol, row = entry.row, column, "Ledger write failed: {}", e);
                    report
                        .failures
                        .push((record.symbol.clone(), format!("ledger {}: {}", column, e)));
                }
            }
        }

        tracing::info!(
            "Stop-loss sweep: {} checked, {} liquidated, {} unpriced",
            report.checked,
            report.liquidated.len(),
            report.unpriced.len()
        );
        Ok(report)
    }
}
