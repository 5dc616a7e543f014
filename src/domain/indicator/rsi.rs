//! Cumulative (expanding-window) RSI.
//!
//! RSI[i] = G / (G + L), where over all close changes up to and including i:
//! - G = sum of positive changes
//! - L = sum of |negative changes|
//!
//! The ratio is in 0..=1 and is not smoothed or windowed: every observation
//! since the start of the series contributes. Undefined while G + L == 0 and
//! before `min_observations` closes have been seen.

use super::IndicatorValues;

pub fn calculate_cumulative_rsi(closes: &[f64], min_observations: usize) -> IndicatorValues {
    let mut values = Vec::with_capacity(closes.len());
    let mut gains = 0.0;
    let mut losses = 0.0;

    for (i, &close) in closes.iter().enumerate() {
        if i > 0 {
            let change = close - closes[i - 1];
            if change > 0.0 {
                gains += change;
            } else if change < 0.0 {
                losses -= change;
            }
        }

        let value = if i + 1 < min_observations {
            None
        } else {
            super::checked_ratio(gains, gains + losses)
        };
        values.push(value);
    }

    values
}
