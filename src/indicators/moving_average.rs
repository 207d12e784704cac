/// Calculate Simple Moving Average (SMA) over the last `period` prices
pub fn calculate_sma(prices: &[f64], period: usize) -> Option<f64> {
    if period == 0 || prices.len() < period {
        return None;
    }

    let sum: f64 = prices.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// SMA of the `period` closes that precede the most recent one
///
/// The last element is the still-forming candle and is left out, so the
/// window is `prices[len - period - 1 .. len - 1]`.
pub fn calculate_trailing_sma(prices: &[f64], period: usize) -> Option<f64> {
    let (_, settled) = prices.split_last()?;
    calculate_sma(settled, period)
}
