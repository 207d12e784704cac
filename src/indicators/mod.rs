// Technical indicators module
// Pure computations turning a candle window into a feature set

pub mod features;
pub mod moving_average;
pub mod patterns;
pub mod rsi;
pub mod tick_size;
pub mod volume;

pub use features::{compute_features, FeatureError, IndicatorConfig, InstrumentFeatures};
pub use moving_average::{calculate_sma, calculate_trailing_sma};
pub use patterns::{is_bullish_engulfing, is_uptrend, PriceRange};
pub use rsi::calculate_rsi;
pub use tick_size::{format_price, tick_precision};
pub use volume::calculate_volume_trend;
