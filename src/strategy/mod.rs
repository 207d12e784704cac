// Trading strategy module
pub mod momentum;
pub mod signals;

use crate::indicators::{FeatureError, InstrumentFeatures};
use crate::models::Candle;

pub use momentum::MomentumStrategy;
pub use signals::{classify, BearishTag, BullishTag, Signal, SignalConfig};

/// Base trait for all screening strategies
pub trait Strategy: Send + Sync {
    /// Derive features from a candle window and classify the instrument
    fn evaluate(
        &self,
        symbol: &str,
        candles: &[Candle],
        tick_size: &str,
    ) -> Result<(InstrumentFeatures, Signal), FeatureError>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles required for this strategy
    fn min_candles_required(&self) -> usize;
}
