/// Volume trend between two three-candle blocks near the end of the window
///
/// `before` sums volumes at offsets [-7, -4) from the end, `after` sums
/// [-4, -1); the current candle is left out. Returns the percentage change
/// `(after - before) / before * 100`.
///
/// Returns `None` when fewer than 7 volumes are given or when `before` is
/// zero, in which case the ratio is undefined.
pub fn calculate_volume_trend(volumes: &[f64]) -> Option<f64> {
    let len = volumes.len();
    if len < 7 {
        return None;
    }

    let before: f64 = volumes[len - 7..len - 4].iter().sum();
    let after: f64 = volumes[len - 4..len - 1].iter().sum();

    if before == 0.0 {
        return None;
    }

    Some((after - before) / before * 100.0)
}
