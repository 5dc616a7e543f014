//! Rolling sample standard deviation.
//!
//! STDDEV(n)[i] = sqrt(sum((C[i-j] - SMA(n)[i])^2 for j in 0..n) / (n - 1))
//! Warmup: first (n-1) observations are undefined; n < 2 is always undefined.
//! A window of identical closes yields exactly 0.0.

use super::IndicatorValues;

pub fn calculate_stddev(closes: &[f64], period: usize) -> IndicatorValues {
    if period < 2 {
        return vec![None; closes.len()];
    }

    (0..closes.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &closes[i + 1 - period..=i];
            if window.iter().all(|&c| c == window[0]) {
                return Some(0.0);
            }

            let mean = window.iter().sum::<f64>() / period as f64;
            let variance = window
                .iter()
                .map(|c| {
                    let diff = c - mean;
                    diff * diff
                })
                .sum::<f64>()
                / (period - 1) as f64;

            super::finite(variance.sqrt())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn stddev_warmup() {
        let values = calculate_stddev(&[10.0, 20.0, 30.0, 40.0, 50.0], 3);
        assert_eq!(values[0], None);
        assert_eq!(values[1], None);
        assert!(values[2].is_some());
    }

    #[test]
    fn stddev_constant_values_is_exact_zero() {
        let values = calculate_stddev(&[0.1; 25], 20);
        for v in &values[19..] {
            assert_eq!(*v, Some(0.0));
        }
    }

    #[test]
    fn stddev_uses_sample_denominator() {
        let values = calculate_stddev(&[10.0, 20.0, 30.0], 3);
        // mean 20, squared deviations 100 + 0 + 100, / (3 - 1)
        assert_relative_eq!(values[2].unwrap(), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn stddev_known_values() {
        let values = calculate_stddev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0], 8);
        // population stddev is 2.0; sample is sqrt(32 / 7)
        assert_relative_eq!(values[7].unwrap(), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn stddev_period_1_undefined() {
        assert_eq!(calculate_stddev(&[1.0, 2.0], 1), vec![None, None]);
    }
}
