//! Exponential Moving Average indicator.
//!
//! Span convention: alpha = 2/(span+1). Bias-adjusted weighting: the value at
//! i is the weighted mean of all observations so far, the observation j steps
//! back carrying weight (1-alpha)^j.
//!
//! Missing inputs are skipped but still age the weights of earlier
//! observations. Output is undefined until `min_periods` observations
//! have been seen.

use super::IndicatorValues;

pub fn calculate_ema(values: &[Option<f64>], span: usize, min_periods: usize) -> IndicatorValues {
    if span == 0 {
        return vec![None; values.len()];
    }

    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;
    let min_periods = min_periods.max(1);

    let mut out = Vec::with_capacity(values.len());
    let mut average: Option<f64> = None;
    let mut old_weight = 1.0;
    let mut observations = 0usize;

    for value in values {
        match (*value, average) {
            (Some(x), Some(prev)) => {
                old_weight *= decay;
                average = Some((old_weight * prev + x) / (old_weight + 1.0));
                old_weight += 1.0;
                observations += 1;
            }
            (Some(x), None) => {
                average = Some(x);
                observations += 1;
            }
            (None, Some(_)) => old_weight *= decay,
            (None, None) => {}
        }

        out.push(if observations >= min_periods {
            average.and_then(super::finite)
        } else {
            None
        });
    }

    out
}

/// EMA over a plain close series.
pub fn calculate_ema_closes(closes: &[f64], span: usize, min_periods: usize) -> IndicatorValues {
    let values: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    calculate_ema(&values, span, min_periods)
}
