/// Decimal places implied by a minimum price increment
///
/// Counts fractional digits up to and including the first `1`, so
/// "0.00010000" gives 4. An integer increment ("1", "1.00000000") gives 0.
/// Malformed input also yields 0, which callers treat as "cannot round".
pub fn tick_precision(increment: &str) -> u32 {
    let increment = increment.trim();
    let (whole, fraction) = match increment.split_once('.') {
        Some(parts) => parts,
        None => return 0,
    };

    if whole.trim_start_matches('0') == "1" {
        return 0;
    }

    let mut precision = 0;
    for digit in fraction.chars() {
        precision += 1;
        if digit == '1' {
            break;
        }
    }
    precision
}

/// Format a price with the given tick precision
///
/// Precisions 1 through 8 are honoured; anything else falls back to 9
/// decimals.
pub fn format_price(price: f64, precision: u32) -> String {
    let decimals = match precision {
        1..=8 => precision as usize,
        _ => 9,
    };
    format!("{:.*}", decimals, price)
}
