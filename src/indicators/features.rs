use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    calculate_rsi, calculate_trailing_sma, calculate_volume_trend, is_bullish_engulfing,
    is_uptrend, tick_precision, PriceRange,
};
use crate::models::Candle;

/// Parameters of the per-instrument feature computation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Exact number of candles analysed per instrument
    pub window: usize,
    pub ma_period: usize,
    pub rsi_period: usize,
    /// Candles per block in the uptrend comparison
    pub trend_span: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            window: 300,
            ma_period: 20,
            rsi_period: 14,
            trend_span: 100,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    #[error("insufficient history: {got} candles, need {need}")]
    InsufficientHistory { got: usize, need: usize },
    #[error("no volume in the reference block, volume trend undefined")]
    ZeroVolume,
    #[error("indicator {0} could not be computed")]
    Incomputable(&'static str),
}

/// Everything the classifier needs about one instrument for one cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentFeatures {
    pub symbol: String,
    /// Close time of the last candle
    pub as_of: DateTime<Utc>,
    pub moving_average: f64,
    pub rsi: f64,
    pub current_price: f64,
    pub volume: f64,
    pub volume_trend: f64,
    pub is_engulfing: bool,
    pub is_uptrend: bool,
    pub is_breakout: bool,
    pub is_breakdown: bool,
    pub tick_precision: u32,
}

/// Derive the feature set from a candle window
///
/// Windows shorter than `config.window` are rejected before any indicator is
/// computed; longer ones are cut down to their most recent `config.window`
/// candles.
pub fn compute_features(
    symbol: &str,
    candles: &[Candle],
    tick_size: &str,
    config: &IndicatorConfig,
) -> Result<InstrumentFeatures, FeatureError> {
    if candles.len() < config.window {
        return Err(FeatureError::InsufficientHistory {
            got: candles.len(),
            need: config.window,
        });
    }
    let candles = &candles[candles.len() - config.window..];

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.quote_volume).collect();
    let (current, settled) = closes
        .split_last()
        .ok_or(FeatureError::Incomputable("window"))?;
    let last = candles.last().ok_or(FeatureError::Incomputable("window"))?;

    let moving_average = calculate_trailing_sma(&closes, config.ma_period)
        .ok_or(FeatureError::Incomputable("moving average"))?;
    let rsi = calculate_rsi(settled, config.rsi_period).ok_or(FeatureError::Incomputable("rsi"))?;
    let volume_trend = calculate_volume_trend(&volumes).ok_or(FeatureError::ZeroVolume)?;
    let range = PriceRange::from_candles(candles).ok_or(FeatureError::Incomputable("range"))?;

    Ok(InstrumentFeatures {
        symbol: symbol.to_string(),
        as_of: last.close_time,
        moving_average,
        rsi,
        current_price: *current,
        volume: last.quote_volume,
        volume_trend,
        is_engulfing: is_bullish_engulfing(candles),
        is_uptrend: is_uptrend(&closes, config.trend_span),
        is_breakout: range.is_breakout(*current),
        is_breakdown: range.is_breakdown(*current),
        tick_precision: tick_precision(tick_size),
    })
}
