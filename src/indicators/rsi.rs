/// Calculate Relative Strength Index (RSI) with Wilder smoothing
///
/// The first `period` prices seed the average gain and loss, then every
/// later price rolls the averages forward one step:
/// `avg = (avg * (n - 1) + change) / n` with `n = period - 1`.
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
///
/// A fully flat seed window reports 50.
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    if period < 2 || prices.len() < period {
        return None;
    }

    let (seed, remaining) = prices.split_at(period);
    let smoothing = (period - 1) as f64;

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for pair in seed.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss -= change;
        }
    }
    avg_gain /= smoothing;
    avg_loss /= smoothing;

    let mut previous = seed[period - 1];
    for &price in remaining {
        let change = price - previous;
        let (gain, loss) = if change > 0.0 { (change, 0.0) } else { (0.0, -change) };
        avg_gain = (avg_gain * (smoothing - 1.0) + gain) / smoothing;
        avg_loss = (avg_loss * (smoothing - 1.0) + loss) / smoothing;
        previous = price;
    }

    Some(relative_strength(avg_gain, avg_loss))
}

fn relative_strength(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return if avg_gain == 0.0 { 50.0 } else { 100.0 };
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
