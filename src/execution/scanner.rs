use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::fan_out::fan_out;
use crate::api::{Exchange, ExchangeError};
use crate::indicators::{FeatureError, InstrumentFeatures};
use crate::models::Instrument;
use crate::strategy::{Signal, Strategy};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Only pairs quoted in this asset are scanned
    pub quote_asset: String,
    pub interval: String,
    pub max_in_flight: usize,
    /// Upper bound on one candle fetch
    pub fetch_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            quote_asset: "USDT".to_string(),
            interval: "15m".to_string(),
            max_in_flight: 20,
            fetch_timeout_secs: 15,
        }
    }
}

/// Why an instrument contributed nothing to this scan
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error("candle fetch failed: {0}")]
    Fetch(#[from] ExchangeError),
    #[error("candle fetch timed out after {0}s")]
    Timeout(u64),
    #[error("not eligible: {0}")]
    Ineligible(#[from] FeatureError),
    #[error("scan worker aborted")]
    Aborted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScannedInstrument {
    pub features: InstrumentFeatures,
    pub signal: Signal,
}

/// Outcome of one scan; each attempted instrument is counted exactly once
#[derive(Debug, Default)]
pub struct ScanReport {
    pub bullish: HashMap<String, ScannedInstrument>,
    pub bearish: HashMap<String, ScannedInstrument>,
    pub untagged: usize,
    pub skipped: Vec<(String, SkipReason)>,
}

impl ScanReport {
    /// Single writer for both signal sets
    fn record(&mut self, scanned: ScannedInstrument) {
        let symbol = scanned.features.symbol.clone();
        match (scanned.signal.is_bullish(), scanned.signal.is_bearish()) {
            (true, true) => {
                self.bearish.insert(symbol.clone(), scanned.clone());
                self.bullish.insert(symbol, scanned);
            }
            (true, false) => {
                self.bullish.insert(symbol, scanned);
            }
            (false, true) => {
                self.bearish.insert(symbol, scanned);
            }
            (false, false) => self.untagged += 1,
        }
    }

    pub fn bullish_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.bullish.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    pub fn bearish_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.bearish.keys().cloned().collect();
        symbols.sort();
        symbols
    }

    /// Instruments whose window was analysed
    pub fn analysed(&self) -> usize {
        let both = self
            .bullish
            .keys()
            .filter(|s| self.bearish.contains_key(*s))
            .count();
        self.bullish.len() + self.bearish.len() - both + self.untagged
    }
}

/// Concurrent per-instrument fetch + classify pass
pub struct Scanner {
    exchange: Arc<dyn Exchange>,
    strategy: Arc<dyn Strategy>,
    config: ScannerConfig,
}

impl Scanner {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        strategy: Arc<dyn Strategy>,
        config: ScannerConfig,
    ) -> Self {
        Self {
            exchange,
            strategy,
            config,
        }
    }

    /// Fetch and classify every instrument; returns once all were attempted
    pub async fn scan(&self, instruments: Vec<Instrument>) -> ScanReport {
        let total = instruments.len();
        let window = self.strategy.min_candles_required();
        let fetch_timeout = self.config.fetch_timeout_secs;

        tracing::info!(
            "Scanning {} instruments ({} candles, {} in flight, strategy {})",
            total,
            window,
            self.config.max_in_flight,
            self.strategy.name()
        );

        let results = fan_out(instruments, self.config.max_in_flight, |instrument| {
            let exchange = self.exchange.clone();
            let strategy = self.strategy.clone();
            let interval = self.config.interval.clone();
            async move {
                let fetched = tokio::time::timeout(
                    Duration::from_secs(fetch_timeout),
                    exchange.get_candles(&instrument.symbol, &interval, window),
                )
                .await;
                let candles = match fetched {
                    Ok(Ok(candles)) => candles,
                    Ok(Err(e)) => return Err(SkipReason::Fetch(e)),
                    Err(_) => return Err(SkipReason::Timeout(fetch_timeout)),
                };
                let (features, signal) =
                    strategy.evaluate(&instrument.symbol, &candles, &instrument.tick_size)?;
                Ok(ScannedInstrument { features, signal })
            }
        })
        .await;

        let mut report = ScanReport::default();
        for (instrument, outcome) in results.completed {
            match outcome {
                Ok(scanned) => report.record(scanned),
                Err(reason) => {
                    tracing::warn!(symbol = %instrument.symbol, "Skipped: {}", reason);
                    report.skipped.push((instrument.symbol, reason));
                }
            }
        }
        for instrument in results.aborted {
            report.skipped.push((instrument.symbol, SkipReason::Aborted));
        }

        tracing::info!(
            "Scan complete: {} bullish, {} bearish, {} untagged, {} skipped of {}",
            report.bullish.len(),
            report.bearish.len(),
            report.untagged,
            report.skipped.len(),
            total
        );
        report
    }
}
