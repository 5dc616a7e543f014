//! Rolling-window mean and minimum.
//!
//! SMA(n)[i] = sum(C[i-n+1..=i]) / n
//! MIN(n)[i] = min(C[i-n+1..=i])
//! Warmup: first (n-1) observations are undefined.

use super::IndicatorValues;

pub fn calculate_sma(closes: &[f64], period: usize) -> IndicatorValues {
    rolling(closes, period, |window| {
        window.iter().sum::<f64>() / window.len() as f64
    })
}

pub fn calculate_rolling_min(closes: &[f64], period: usize) -> IndicatorValues {
    rolling(closes, period, |window| {
        window.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

fn rolling<F>(closes: &[f64], period: usize, f: F) -> IndicatorValues
where
    F: Fn(&[f64]) -> f64,
{
    if period == 0 {
        return vec![None; closes.len()];
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < period {
                None
            } else {
                super::finite(f(&closes[i + 1 - period..=i]))
            }
        })
        .collect()
}
