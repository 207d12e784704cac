use serde::{Deserialize, Serialize};

use crate::indicators::InstrumentFeatures;

/// Thresholds for signal generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Price must reach this multiple of the moving average to be bullish
    pub bullish_ma_ratio: f64,
    /// Price at or below this multiple of the moving average leans bearish
    pub bearish_ma_ratio: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            bullish_ma_ratio: 1.02,
            bearish_ma_ratio: 0.98,
        }
    }
}

/// Which bullish rules fired
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BullishTag {
    /// Engulfing pattern + price above average + uptrend
    pub pattern_momentum: bool,
    /// Price above average + range breakout
    pub breakout: bool,
}

/// Which bearish rules fired
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BearishTag {
    /// Price below average without an uptrend
    pub below_average: bool,
    /// Range breakdown
    pub breakdown: bool,
}

/// Classification of one instrument; both tags may be present at once
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signal {
    pub bullish: Option<BullishTag>,
    pub bearish: Option<BearishTag>,
}

impl Signal {
    pub fn is_bullish(&self) -> bool {
        self.bullish.is_some()
    }

    pub fn is_bearish(&self) -> bool {
        self.bearish.is_some()
    }

    pub fn is_untagged(&self) -> bool {
        self.bullish.is_none() && self.bearish.is_none()
    }
}

/// Bucket an instrument into bullish and/or bearish candidates
///
/// Bullish iff (engulfing AND price >= 1.02 x MA AND uptrend) OR
/// (price >= 1.02 x MA AND breakout).
/// Bearish iff (price <= 0.98 x MA AND NOT uptrend) OR breakdown.
pub fn classify(features: &InstrumentFeatures, config: &SignalConfig) -> Signal {
    let above_average =
        features.current_price >= features.moving_average * config.bullish_ma_ratio;
    let below_average =
        features.current_price <= features.moving_average * config.bearish_ma_ratio;

    let pattern_momentum = features.is_engulfing && above_average && features.is_uptrend;
    let breakout = above_average && features.is_breakout;
    let bullish = (pattern_momentum || breakout).then_some(BullishTag {
        pattern_momentum,
        breakout,
    });

    let below_average = below_average && !features.is_uptrend;
    let breakdown = features.is_breakdown;
    let bearish = (below_average || breakdown).then_some(BearishTag {
        below_average,
        breakdown,
    });

    let signal = Signal { bullish, bearish };

    tracing::debug!(
        symbol = %features.symbol,
        price = features.current_price,
        ma = features.moving_average,
        rsi = features.rsi,
        volume_trend = features.volume_trend,
        "Classified: bullish={:?} bearish={:?}",
        signal.bullish,
        signal.bearish
    );

    signal
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn create_test_features() -> InstrumentFeatures {
        InstrumentFeatures {
            symbol: "BTCUSDT".to_string(),
            as_of: Utc::now(),
            moving_average: 100.0,
            rsi: 50.0,
            current_price: 100.0,
            volume: 1000.0,
            volume_trend: 0.0,
            is_engulfing: false,
            is_uptrend: false,
            is_breakout: false,
            is_breakdown: false,
            tick_precision: 2,
        }
    }

    #[test]
    fn test_neutral_is_untagged() {
        let signal = classify(&create_test_features(), &SignalConfig::default());
        assert!(signal.is_untagged());
    }

    #[test]
    fn test_pattern_momentum_bullish() {
        let features = InstrumentFeatures {
            current_price: 102.0,
            is_engulfing: true,
            is_uptrend: true,
            ..create_test_features()
        };
        let signal = classify(&features, &SignalConfig::default());
        assert_eq!(
            signal.bullish,
            Some(BullishTag {
                pattern_momentum: true,
                breakout: false
            })
        );
        assert!(!signal.is_bearish());
    }

    #[test]
    fn test_pattern_without_uptrend_is_not_bullish() {
        let features = InstrumentFeatures {
            current_price: 105.0,
            is_engulfing: true,
            ..create_test_features()
        };
        assert!(!classify(&features, &SignalConfig::default()).is_bullish());
    }

    #[test]
    fn test_breakout_needs_price_above_average() {
        let features = InstrumentFeatures {
            current_price: 101.9,
            is_breakout: true,
            ..create_test_features()
        };
        assert!(!classify(&features, &SignalConfig::default()).is_bullish());

        let features = InstrumentFeatures {
            current_price: 102.5,
            ..features
        };
        let signal = classify(&features, &SignalConfig::default());
        assert_eq!(
            signal.bullish,
            Some(BullishTag {
                pattern_momentum: false,
                breakout: true
            })
        );
    }

    #[test]
    fn test_below_average_bearish_only_without_uptrend() {
        let features = InstrumentFeatures {
            current_price: 97.0,
            ..create_test_features()
        };
        let signal = classify(&features, &SignalConfig::default());
        assert_eq!(
            signal.bearish,
            Some(BearishTag {
                below_average: true,
                breakdown: false
            })
        );

        let features = InstrumentFeatures {
            is_uptrend: true,
            ..features
        };
        assert!(!classify(&features, &SignalConfig::default()).is_bearish());
    }

    #[test]
    fn test_breakdown_alone_is_bearish() {
        let features = InstrumentFeatures {
            is_breakdown: true,
            is_uptrend: true,
            ..create_test_features()
        };
        let signal = classify(&features, &SignalConfig::default());
        assert_eq!(
            signal.bearish,
            Some(BearishTag {
                below_average: false,
                breakdown: true
            })
        );
    }

    #[test]
    fn test_both_tags_can_hold() {
        let features = InstrumentFeatures {
            current_price: 110.0,
            is_breakout: true,
            is_breakdown: true,
            ..create_test_features()
        };
        let signal = classify(&features, &SignalConfig::default());
        assert!(signal.is_bullish());
        assert!(signal.is_bearish());
    }
}
