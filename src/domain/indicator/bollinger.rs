//! Bollinger Bands indicator.
//!
//! - Middle: SMA(n)
//! - Upper: Middle + k × STDDEV(n)
//! - Lower: Middle - k × STDDEV(n)
//!
//! STDDEV is the sample standard deviation (divides by n - 1).
//! Default parameters: period=20, k=2.0
//! Warmup: first (period-1) observations are undefined.

use super::{calculate_sma, calculate_stddev};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_K: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

impl BollingerBands {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Position of `close` inside the bands: 0 at the lower band, 1 at the upper.
    ///
    /// Undefined for a zero-width band.
    pub fn ratio(&self, close: f64) -> Option<f64> {
        let width = self.width();
        if width <= 0.0 {
            return None;
        }
        super::checked_ratio(close - self.lower, width)
    }
}

pub fn calculate_bollinger(closes: &[f64], period: usize, k: f64) -> Vec<Option<BollingerBands>> {
    let middle = calculate_sma(closes, period);
    let stddev = calculate_stddev(closes, period);

    middle
        .into_iter()
        .zip(stddev)
        .map(|(m, s)| match (m, s) {
            (Some(middle), Some(stddev)) => Some(BollingerBands {
                upper: middle + k * stddev,
                middle,
                lower: middle - k * stddev,
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn bollinger_warmup() {
        let bands = calculate_bollinger(&[10.0, 20.0, 30.0, 40.0, 50.0], 3, 2.0);
        assert!(bands[0].is_none());
        assert!(bands[1].is_none());
        assert!(bands[2].is_some());
        assert!(bands[4].is_some());
    }

    #[test]
    fn bollinger_basic_calculation() {
        let bands = calculate_bollinger(&[10.0, 20.0, 30.0], 3, 2.0);
        let b = bands[2].unwrap();
        // sample stddev of 10, 20, 30 is 10
        assert_relative_eq!(b.middle, 20.0, epsilon = 1e-12);
        assert_relative_eq!(b.upper, 40.0, epsilon = 1e-12);
        assert_relative_eq!(b.lower, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn bollinger_symmetry() {
        let bands = calculate_bollinger(&[10.0, 14.0, 11.0, 17.0], 4, 2.0);
        let b = bands[3].unwrap();
        assert_relative_eq!(b.upper - b.middle, b.middle - b.lower, epsilon = 1e-12);
    }

    #[test]
    fn ratio_inside_bands() {
        let b = BollingerBands {
            upper: 40.0,
            middle: 20.0,
            lower: 0.0,
        };
        assert_relative_eq!(b.ratio(30.0).unwrap(), 0.75);
        assert_relative_eq!(b.ratio(0.0).unwrap(), 0.0);
        assert_relative_eq!(b.ratio(50.0).unwrap(), 1.25);
    }

    #[test]
    fn ratio_undefined_for_flat_window() {
        let bands = calculate_bollinger(&[100.0; 20], 20, 2.0);
        let b = bands[19].unwrap();
        assert_eq!(b.width(), 0.0);
        assert_eq!(b.ratio(100.0), None);
    }
}
