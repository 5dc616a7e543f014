//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9 with minimum observation
//! counts 10/20/8 before each EMA produces a value. The signal EMA starts at
//! the first defined MACD line value, so with defaults the histogram is first
//! defined at observation 20 + 8 - 1 = 27.

use super::ema::{calculate_ema, calculate_ema_closes};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;
pub const DEFAULT_FAST_MIN_PERIODS: usize = 10;
pub const DEFAULT_SLOW_MIN_PERIODS: usize = 20;
pub const DEFAULT_SIGNAL_MIN_PERIODS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
    pub fast_min_periods: usize,
    pub slow_min_periods: usize,
    pub signal_min_periods: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        MacdParams {
            fast: DEFAULT_FAST,
            slow: DEFAULT_SLOW,
            signal: DEFAULT_SIGNAL,
            fast_min_periods: DEFAULT_FAST_MIN_PERIODS,
            slow_min_periods: DEFAULT_SLOW_MIN_PERIODS,
            signal_min_periods: DEFAULT_SIGNAL_MIN_PERIODS,
        }
    }
}

impl MacdParams {
    /// Number of observations before the histogram can first be defined.
    pub fn warmup(&self) -> usize {
        let line = self.fast_min_periods.max(self.slow_min_periods).max(1);
        line + self.signal_min_periods.max(1) - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdPoint {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn calculate_macd(closes: &[f64], params: &MacdParams) -> Vec<Option<MacdPoint>> {
    let fast = calculate_ema_closes(closes, params.fast, params.fast_min_periods);
    let slow = calculate_ema_closes(closes, params.slow, params.slow_min_periods);

    let line: Vec<Option<f64>> = fast
        .iter()
        .zip(&slow)
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => super::finite(f - s),
            _ => None,
        })
        .collect();

    let signal = calculate_ema(&line, params.signal, params.signal_min_periods);

    line.iter()
        .zip(signal)
        .map(|(l, s)| match (*l, s) {
            (Some(line), Some(signal)) => super::finite(line - signal).map(|histogram| MacdPoint {
                line,
                signal,
                histogram,
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn trending(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64 * 0.5 + (i % 3) as f64).collect()
    }

    #[test]
    fn macd_default_warmup() {
        let params = MacdParams::default();
        assert_eq!(params.warmup(), 27);

        let points = calculate_macd(&trending(40), &params);
        assert!(points[..26].iter().all(Option::is_none));
        assert!(points[26..].iter().all(Option::is_some));
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let points = calculate_macd(&trending(40), &MacdParams::default());
        for p in points.iter().flatten() {
            assert_relative_eq!(p.histogram, p.line - p.signal, epsilon = 1e-12);
        }
    }

    #[test]
    fn macd_constant_series_is_zero() {
        let points = calculate_macd(&[50.0; 40], &MacdParams::default());
        let last = points[39].unwrap();
        assert_relative_eq!(last.line, 0.0, epsilon = 1e-12);
        assert_relative_eq!(last.histogram, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn macd_small_params() {
        let params = MacdParams {
            fast: 2,
            slow: 3,
            signal: 2,
            fast_min_periods: 1,
            slow_min_periods: 2,
            signal_min_periods: 2,
        };
        assert_eq!(params.warmup(), 3);

        let points = calculate_macd(&[1.0, 2.0, 4.0, 8.0], &params);
        assert!(points[0].is_none());
        assert!(points[1].is_none());
        assert!(points[2].is_some());
    }

    #[test]
    fn macd_short_series() {
        let points = calculate_macd(&trending(10), &MacdParams::default());
        assert_eq!(points.len(), 10);
        assert!(points.iter().all(Option::is_none));
    }

    #[test]
    fn macd_empty() {
        assert!(calculate_macd(&[], &MacdParams::default()).is_empty());
    }
}
