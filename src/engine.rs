use chrono::{Duration, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::api::{Exchange, Notifier};
use crate::config::Config;
use crate::execution::{allocate, Executor, PositionMonitor, ScannedInstrument, Scanner};
use crate::models::{Blacklist, RecentTrade, TradeRecord, Watchlist};
use crate::persistence::TradeLedger;
use crate::strategy::Strategy;

pub const SCREENING_TITLE: &str = "PARAMETER DATA";

#[derive(Debug, Clone, PartialEq)]
pub struct StageError {
    pub stage: &'static str,
    pub message: String,
}

/// Everything that went wrong in one cycle, plus a few counters
///
/// No stage failure stops the cycle; each is recorded here instead.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleSummary {
    pub cycle: &'static str,
    pub errors: Vec<StageError>,
    pub counters: BTreeMap<&'static str, usize>,
    /// Why the cycle placed no trades, when it was rejected up front
    pub rejection: Option<String>,
}

impl CycleSummary {
    pub fn new(cycle: &'static str) -> Self {
        Self {
            cycle,
            errors: Vec::new(),
            counters: BTreeMap::new(),
            rejection: None,
        }
    }

    pub fn record_error(&mut self, stage: &'static str, error: impl fmt::Display) {
        tracing::warn!(cycle = self.cycle, stage, "{}", error);
        self.errors.push(StageError {
            stage,
            message: error.to_string(),
        });
    }

    pub fn count(&mut self, name: &'static str, value: usize) {
        self.counters.insert(name, value);
    }

    pub fn counter(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn has_errors_in(&self, stage: &str) -> bool {
        self.errors.iter().any(|e| e.stage == stage)
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    fn finish(self) -> Self {
        if self.is_clean() {
            tracing::info!(cycle = self.cycle, counters = ?self.counters, "Cycle finished");
        } else {
            tracing::warn!(
                cycle = self.cycle,
                counters = ?self.counters,
                "Cycle finished with {} errors: {:?}",
                self.errors.len(),
                self.errors
            );
        }
        self
    }
}

/// The screening, status-refresh and stop-loss cycles over shared collaborators
pub struct Engine {
    exchange: Arc<dyn Exchange>,
    ledger: TradeLedger,
    notifier: Arc<dyn Notifier>,
    strategy: Arc<dyn Strategy>,
    config: Config,
}

impl Engine {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        ledger: TradeLedger,
        notifier: Arc<dyn Notifier>,
        strategy: Arc<dyn Strategy>,
        config: Config,
    ) -> Self {
        Self {
            exchange,
            ledger,
            notifier,
            strategy,
            config,
        }
    }

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    /// Scan, allocate, execute, then write back and notify
    pub async fn run_screening(&self) -> CycleSummary {
        let mut summary = CycleSummary::new("screening");
        let quote_asset = self.config.scanner.quote_asset.as_str();
        let now = Self::now();
        let window = Duration::minutes(self.config.trading.blacklist_window_minutes);

        let (balance, instruments, watchlist, recent) = tokio::join!(
            self.exchange.get_free_balance(quote_asset),
            self.exchange.list_instruments(),
            self.ledger.load_watchlist(),
            self.ledger.load_recent_trades(now, window),
        );

        let instruments = match instruments {
            Ok(all) => all
                .into_iter()
                .filter(|i| i.is_tradable(quote_asset))
                .collect(),
            Err(e) => {
                summary.record_error("instruments", e);
                Vec::new()
            }
        };
        let watchlist = watchlist.unwrap_or_else(|e| {
            summary.record_error("watchlist", e);
            Watchlist::default()
        });
        let recent = match recent {
            Ok(recent) => Some(recent),
            Err(e) => {
                summary.record_error("recent_trades", e);
                None
            }
        };
        let balance = match balance {
            Ok(balance) => Some(balance),
            Err(e) => {
                summary.record_error("balance", e);
                None
            }
        };

        let scanner = Scanner::new(
            self.exchange.clone(),
            self.strategy.clone(),
            self.config.scanner.clone(),
        );
        let report = scanner.scan(instruments).await;
        summary.count("bullish", report.bullish.len());
        summary.count("bearish", report.bearish.len());
        summary.count("skipped", report.skipped.len());

        let mut new_records = Vec::new();
        if let (Some(balance), Some((blacklist, _))) = (balance, recent.as_ref()) {
            new_records = self
                .trade(balance, &watchlist, blacklist, &report.bullish, now, &mut summary)
                .await;
        } else {
            summary.rejection = Some("balance or recent trades unavailable".to_string());
        }
        summary.count("trades", new_records.len());

        let bullish = report.bullish_symbols();
        let bearish = report.bearish_symbols();

        let save_watchlist = self.ledger.save_watchlist(&bullish, &watchlist.current_total);
        let overwrite_recent = async {
            match recent {
                Some((_, mut kept)) => {
                    kept.extend(new_records.iter().map(RecentTrade::from));
                    Some(self.ledger.overwrite_recent_trades(&kept).await)
                }
                None => None,
            }
        };
        let append_trades = self.ledger.append_trades(&new_records);
        let notify = self.notifier.notify(SCREENING_TITLE, &bullish, &bearish);

        let (saved, overwritten, appended, notified) =
            tokio::join!(save_watchlist, overwrite_recent, append_trades, notify);

        if let Err(e) = saved {
            summary.record_error("write_watchlist", e);
        }
        if let Some(Err(e)) = overwritten {
            summary.record_error("write_recent_trades", e);
        }
        if let Err(e) = appended {
            summary.record_error("write_order_book", e);
        }
        if let Err(e) = notified {
            summary.record_error("notify", e);
        }

        summary.finish()
    }

    async fn trade(
        &self,
        balance: f64,
        watchlist: &Watchlist,
        blacklist: &Blacklist,
        bullish: &HashMap<String, ScannedInstrument>,
        now: NaiveDateTime,
        summary: &mut CycleSummary,
    ) -> Vec<TradeRecord> {
        let trading = &self.config.trading;
        let plan = match allocate(balance, watchlist, bullish, trading) {
            Ok(plan) => plan,
            Err(rejection) => {
                tracing::info!("No trades this cycle: {}", rejection);
                summary.rejection = Some(rejection.to_string());
                return Vec::new();
            }
        };
        summary.count("candidates", plan.candidates.len());

        let executor = Executor::new(self.exchange.clone(), trading.take_profit_multiplier);
        let report = executor
            .execute_plan(&plan, blacklist, trading.max_open_per_symbol, now)
            .await;
        for (symbol, error) in &report.failures {
            summary.record_error("execution", format!("{}: {}", symbol, error));
        }
        summary.count("unprotected", report.unprotected());
        report.records
    }

    fn monitor(&self) -> PositionMonitor {
        PositionMonitor::new(
            self.exchange.clone(),
            self.ledger.clone(),
            self.config.monitor.clone(),
        )
    }

    pub async fn run_status_refresh(&self) -> CycleSummary {
        let mut summary = CycleSummary::new("status_refresh");
        match self.monitor().refresh_order_status().await {
            Ok(report) => {
                summary.count("checked", report.checked);
                summary.count("reset", report.reset);
                for symbol in report.write_failures {
                    summary.record_error("write_status", symbol);
                }
            }
            Err(e) => summary.record_error("order_book", e),
        }
        summary.finish()
    }

    pub async fn run_stop_loss(&self) -> CycleSummary {
        let mut summary = CycleSummary::new("stop_loss");
        match self.monitor().check_stop_loss().await {
            Ok(report) => {
                summary.count("checked", report.checked);
                summary.count("liquidated", report.liquidated.len());
                summary.count("unpriced", report.unpriced.len());
                summary.count("unsellable", report.unsellable.len());
                for (symbol, message) in report.failures {
                    summary.record_error("liquidation", format!("{}: {}", symbol, message));
                }
            }
            Err(e) => summary.record_error("order_book", e),
        }
        summary.finish()
    }
}
