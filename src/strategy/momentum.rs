use super::{
    signals::{classify, Signal, SignalConfig},
    Strategy,
};
use crate::indicators::{compute_features, FeatureError, IndicatorConfig, InstrumentFeatures};
use crate::models::Candle;

/// Momentum/breakout screening strategy
///
/// This strategy identifies momentum shifts using:
/// - a trailing moving average as the price reference
/// - engulfing candles confirmed by an uptrend
/// - range breakouts and breakdowns over the whole window
///
/// Designed for 15-minute candles with a 300-candle window
#[derive(Debug, Clone, Default)]
pub struct MomentumStrategy {
    indicators: IndicatorConfig,
    signals: SignalConfig,
}

impl MomentumStrategy {
    pub fn new(indicators: IndicatorConfig, signals: SignalConfig) -> Self {
        Self {
            indicators,
            signals,
        }
    }
}

impl Strategy for MomentumStrategy {
    fn evaluate(
        &self,
        symbol: &str,
        candles: &[Candle],
        tick_size: &str,
    ) -> Result<(InstrumentFeatures, Signal), FeatureError> {
        let features = compute_features(symbol, candles, tick_size, &self.indicators)?;
        let signal = classify(&features, &self.signals);
        Ok((features, signal))
    }

    fn name(&self) -> &str {
        "MomentumStrategy"
    }

    fn min_candles_required(&self) -> usize {
        self.indicators.window
    }
}
