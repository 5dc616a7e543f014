//! Technical indicator implementations over close-price slices.
//!
//! Every indicator returns one entry per input observation. Warmup positions
//! and degenerate windows are `None`; a `Some` value is always finite.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rolling;
pub mod rsi;
pub mod stddev;

pub use bollinger::{calculate_bollinger, BollingerBands};
pub use ema::calculate_ema;
pub use macd::{calculate_macd, MacdParams, MacdPoint};
pub use rolling::{calculate_rolling_min, calculate_sma};
pub use rsi::calculate_cumulative_rsi;
pub use stddev::calculate_stddev;

/// Indicator output aligned with its input series.
pub type IndicatorValues = Vec<Option<f64>>;

/// `Some(value)` when `value` is finite.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// `numerator / denominator`, or `None` for a zero denominator or non-finite result.
pub fn checked_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    finite(numerator / denominator)
}
