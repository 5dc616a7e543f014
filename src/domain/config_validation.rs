//! Configuration loading and validation.
//!
//! Every key is optional and falls back to its default. A key that is present
//! but unparsable or out of range is a `ConfigInvalid` error naming the
//! section and key.

use std::str::FromStr;

use crate::domain::backtest::{BacktestConfig, DEFAULT_INITIAL_VALUE};
use crate::domain::error::MeanrevError;
use crate::domain::features::{FeatureParams, DEFAULT_LOOKBACK_WINDOW};
use crate::domain::indicator::{bollinger, macd, MacdParams};
use crate::domain::metrics::DEFAULT_PERIODS_PER_YEAR;
use crate::domain::portfolio::{
    LiquidationPolicy, DEFAULT_NOMINAL_POSITION_SIZE, MAX_NOMINAL_POSITION_SIZE,
};
use crate::domain::selector::DEFAULT_SELECTION_SIZE;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_NAME_COLUMN: &str = "english_code";

/// Where the panel comes from.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub panel: Option<String>,
    pub names: Option<String>,
    pub name_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            panel: None,
            names: None,
            name_column: DEFAULT_NAME_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub data: DataConfig,
    pub backtest: BacktestConfig,
    pub periods_per_year: f64,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            data: DataConfig::default(),
            backtest: BacktestConfig::default(),
            periods_per_year: DEFAULT_PERIODS_PER_YEAR,
        }
    }
}

pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, MeanrevError> {
    let run = RunConfig {
        data: load_data_config(config),
        backtest: load_backtest_config(config)?,
        periods_per_year: parse_or(
            config,
            "metrics",
            "periods_per_year",
            DEFAULT_PERIODS_PER_YEAR,
        )?,
    };
    validate_run_config(&run)?;
    Ok(run)
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_or<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, MeanrevError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| {
            MeanrevError::config_invalid(section, key, format!("cannot parse '{raw}': {e}"))
        }),
    }
}

fn load_data_config(config: &dyn ConfigPort) -> DataConfig {
    DataConfig {
        panel: non_empty(config, "data", "panel"),
        names: non_empty(config, "data", "names"),
        name_column: non_empty(config, "data", "name_column")
            .unwrap_or_else(|| DEFAULT_NAME_COLUMN.to_string()),
    }
}

fn load_feature_params(config: &dyn ConfigPort) -> Result<FeatureParams, MeanrevError> {
    let s = "features";
    Ok(FeatureParams {
        lookback_window: parse_or(config, s, "lookback_window", DEFAULT_LOOKBACK_WINDOW)?,
        bollinger_k: parse_or(config, s, "bollinger_k", bollinger::DEFAULT_K)?,
        macd: MacdParams {
            fast: parse_or(config, s, "macd_fast", macd::DEFAULT_FAST)?,
            slow: parse_or(config, s, "macd_slow", macd::DEFAULT_SLOW)?,
            signal: parse_or(config, s, "macd_signal", macd::DEFAULT_SIGNAL)?,
            fast_min_periods: parse_or(
                config,
                s,
                "macd_fast_min_periods",
                macd::DEFAULT_FAST_MIN_PERIODS,
            )?,
            slow_min_periods: parse_or(
                config,
                s,
                "macd_slow_min_periods",
                macd::DEFAULT_SLOW_MIN_PERIODS,
            )?,
            signal_min_periods: parse_or(
                config,
                s,
                "macd_signal_min_periods",
                macd::DEFAULT_SIGNAL_MIN_PERIODS,
            )?,
        },
    })
}

pub fn load_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, MeanrevError> {
    Ok(BacktestConfig {
        features: load_feature_params(config)?,
        selection_size: parse_or(config, "selection", "selection_size", DEFAULT_SELECTION_SIZE)?,
        nominal_position_size: parse_or(
            config,
            "portfolio",
            "nominal_position_size",
            DEFAULT_NOMINAL_POSITION_SIZE,
        )?,
        liquidation: parse_or(config, "portfolio", "liquidation", LiquidationPolicy::default())?,
        initial_value: parse_or(config, "portfolio", "initial_value", DEFAULT_INITIAL_VALUE)?,
    })
}

pub fn validate_run_config(run: &RunConfig) -> Result<(), MeanrevError> {
    validate_features(&run.backtest.features)?;
    validate_portfolio(&run.backtest)?;
    if !(run.periods_per_year.is_finite() && run.periods_per_year > 0.0) {
        return Err(MeanrevError::config_invalid(
            "metrics",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_features(params: &FeatureParams) -> Result<(), MeanrevError> {
    let s = "features";
    if params.lookback_window == 0 {
        return Err(MeanrevError::config_invalid(
            s,
            "lookback_window",
            "lookback_window must be positive",
        ));
    }
    if !(params.bollinger_k.is_finite() && params.bollinger_k > 0.0) {
        return Err(MeanrevError::config_invalid(
            s,
            "bollinger_k",
            "bollinger_k must be positive",
        ));
    }

    let m = &params.macd;
    for (key, value) in [
        ("macd_fast", m.fast),
        ("macd_slow", m.slow),
        ("macd_signal", m.signal),
        ("macd_fast_min_periods", m.fast_min_periods),
        ("macd_slow_min_periods", m.slow_min_periods),
        ("macd_signal_min_periods", m.signal_min_periods),
    ] {
        if value == 0 {
            return Err(MeanrevError::config_invalid(
                s,
                key,
                format!("{key} must be positive"),
            ));
        }
    }
    if m.fast >= m.slow {
        return Err(MeanrevError::config_invalid(
            s,
            "macd_fast",
            "macd_fast must be shorter than macd_slow",
        ));
    }
    Ok(())
}

fn validate_portfolio(config: &BacktestConfig) -> Result<(), MeanrevError> {
    if config.selection_size == 0 {
        return Err(MeanrevError::config_invalid(
            "selection",
            "selection_size",
            "selection_size must be positive",
        ));
    }
    if config.nominal_position_size == 0 {
        return Err(MeanrevError::config_invalid(
            "portfolio",
            "nominal_position_size",
            "nominal_position_size must be positive",
        ));
    }
    if config.nominal_position_size > MAX_NOMINAL_POSITION_SIZE {
        return Err(MeanrevError::config_invalid(
            "portfolio",
            "nominal_position_size",
            format!("nominal_position_size must not exceed {MAX_NOMINAL_POSITION_SIZE}"),
        ));
    }
    if !(config.initial_value.is_finite() && config.initial_value > 0.0) {
        return Err(MeanrevError::config_invalid(
            "portfolio",
            "initial_value",
            "initial_value must be positive",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn invalid_key(content: &str) -> String {
        match load_run_config(&make_config(content)).unwrap_err() {
            MeanrevError::ConfigInvalid { section, key, .. } => format!("{section}.{key}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_config_uses_defaults() {
        let run = load_run_config(&make_config("")).unwrap();
        assert_eq!(run, RunConfig::default());
        assert_eq!(run.data.name_column, "english_code");
        assert_eq!(run.backtest.selection_size, 10);
        assert_eq!(run.backtest.features.macd.warmup(), 27);
    }

    #[test]
    fn full_config_is_read() {
        let config = make_config(
            r#"
[data]
panel = all_stock_data.csv
names = csi500.csv
name_column = code_name

[features]
lookback_window = 15
bollinger_k = 1.5
macd_fast = 5
macd_slow = 10
macd_signal = 4
macd_fast_min_periods = 3
macd_slow_min_periods = 6
macd_signal_min_periods = 2

[selection]
selection_size = 3

[portfolio]
nominal_position_size = 200
liquidation = retain
initial_value = 1000

[metrics]
periods_per_year = 48
"#,
        );
        let run = load_run_config(&config).unwrap();

        assert_eq!(run.data.panel.as_deref(), Some("all_stock_data.csv"));
        assert_eq!(run.data.names.as_deref(), Some("csi500.csv"));
        assert_eq!(run.data.name_column, "code_name");
        assert_eq!(run.backtest.features.lookback_window, 15);
        assert!((run.backtest.features.bollinger_k - 1.5).abs() < f64::EPSILON);
        assert_eq!(run.backtest.features.macd.warmup(), 7);
        assert_eq!(run.backtest.selection_size, 3);
        assert_eq!(run.backtest.nominal_position_size, 200);
        assert_eq!(run.backtest.liquidation, LiquidationPolicy::Retain);
        assert!((run.backtest.initial_value - 1000.0).abs() < f64::EPSILON);
        assert!((run.periods_per_year - 48.0).abs() < f64::EPSILON);
    }

    #[test]
    fn blank_value_falls_back_to_default() {
        let run = load_run_config(&make_config("[selection]\nselection_size =\n")).unwrap();
        assert_eq!(run.backtest.selection_size, DEFAULT_SELECTION_SIZE);
    }

    #[test]
    fn zero_lookback_fails() {
        assert_eq!(
            invalid_key("[features]\nlookback_window = 0\n"),
            "features.lookback_window"
        );
    }

    #[test]
    fn negative_lookback_fails_to_parse() {
        assert_eq!(
            invalid_key("[features]\nlookback_window = -5\n"),
            "features.lookback_window"
        );
    }

    #[test]
    fn non_numeric_value_fails() {
        assert_eq!(
            invalid_key("[features]\nbollinger_k = wide\n"),
            "features.bollinger_k"
        );
    }

    #[test]
    fn fast_not_shorter_than_slow_fails() {
        assert_eq!(
            invalid_key("[features]\nmacd_fast = 26\nmacd_slow = 12\n"),
            "features.macd_fast"
        );
    }

    #[test]
    fn zero_signal_min_periods_fails() {
        assert_eq!(
            invalid_key("[features]\nmacd_signal_min_periods = 0\n"),
            "features.macd_signal_min_periods"
        );
    }

    #[test]
    fn zero_selection_size_fails() {
        assert_eq!(
            invalid_key("[selection]\nselection_size = 0\n"),
            "selection.selection_size"
        );
    }

    #[test]
    fn unknown_liquidation_policy_fails() {
        assert_eq!(
            invalid_key("[portfolio]\nliquidation = hold\n"),
            "portfolio.liquidation"
        );
    }

    #[test]
    fn oversized_nominal_position_fails() {
        assert_eq!(
            invalid_key("[portfolio]\nnominal_position_size = 18446744073709551615\n"),
            "portfolio.nominal_position_size"
        );
        let run = load_run_config(&make_config("[portfolio]\nnominal_position_size = 4294967295\n"))
            .unwrap();
        assert_eq!(run.backtest.nominal_position_size, MAX_NOMINAL_POSITION_SIZE);
    }

    #[test]
    fn non_positive_initial_value_fails() {
        assert_eq!(
            invalid_key("[portfolio]\ninitial_value = 0\n"),
            "portfolio.initial_value"
        );
        assert_eq!(
            invalid_key("[portfolio]\ninitial_value = -1.0\n"),
            "portfolio.initial_value"
        );
    }

    #[test]
    fn zero_periods_per_year_fails() {
        assert_eq!(
            invalid_key("[metrics]\nperiods_per_year = 0\n"),
            "metrics.periods_per_year"
        );
    }
}
