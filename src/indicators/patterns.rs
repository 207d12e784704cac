//! Candle pattern and price-range detectors
//!
//! All functions work on the candle window oldest-first; the last candle is
//! the current one.

use crate::models::Candle;

/// Bullish engulfing confirmed by the current close
///
/// True iff:
/// - the candle two steps back has a bearish body (close below open),
/// - the candle one step back has a bullish body (close above open),
/// - the bullish body engulfs the bearish one (its open is below the bearish
///   close and its close is above the bearish open),
/// - the current close exceeds the previous close.
pub fn is_bullish_engulfing(candles: &[Candle]) -> bool {
    let [.., bearish, bullish, current] = candles else {
        return false;
    };

    if bearish.close >= bearish.open {
        return false;
    }
    if bullish.close <= bullish.open {
        return false;
    }

    bullish.open < bearish.close && bullish.close > bearish.open && current.close > bullish.close
}

/// Compare the mean close of the first `span` candles with the last `span`
///
/// Strictly higher recent mean means uptrend.
pub fn is_uptrend(closes: &[f64], span: usize) -> bool {
    if span == 0 || closes.len() < span {
        return false;
    }

    let early: f64 = closes[..span].iter().sum::<f64>() / span as f64;
    let late: f64 = closes[closes.len() - span..].iter().sum::<f64>() / span as f64;
    early < late
}

/// Highest and lowest open/close across the window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
}

impl PriceRange {
    /// Both trackers start from the first candle's open, so a strictly
    /// positive series can still register a breakdown.
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let init = PriceRange {
            high: first.open,
            low: first.open,
        };

        Some(candles.iter().fold(init, |range, c| PriceRange {
            high: range.high.max(c.close).max(c.open),
            low: range.low.min(c.close).min(c.open),
        }))
    }

    /// Current close at or above the range high
    pub fn is_breakout(&self, current_close: f64) -> bool {
        current_close >= self.high
    }

    /// Current close at or below the range low
    pub fn is_breakdown(&self, current_close: f64) -> bool {
        current_close <= self.low
    }
}
