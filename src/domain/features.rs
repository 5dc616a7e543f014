//! Per-symbol feature computation.
//!
//! `compute_features` is a pure function of one price series. A panel is
//! processed by `compute_feature_table`, which fans the series out over the
//! rayon pool and joins the results back in panel order.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::fmt;
use tracing::debug;

use super::error::GapReason;
use super::indicator::{
    bollinger, calculate_bollinger, calculate_cumulative_rsi, calculate_macd,
    calculate_rolling_min, calculate_sma, checked_ratio, MacdParams,
};
use super::panel::Panel;
use super::price::PriceSeries;

pub const DEFAULT_LOOKBACK_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureName {
    Pmar,
    BollingerBandsRatio,
    Rsi,
    Macd,
    PctFromTwentyDayLow,
}

impl FeatureName {
    pub const ALL: [FeatureName; 5] = [
        FeatureName::Pmar,
        FeatureName::BollingerBandsRatio,
        FeatureName::Rsi,
        FeatureName::Macd,
        FeatureName::PctFromTwentyDayLow,
    ];

    /// Composite ranking key, most significant first.
    pub const RANKING_KEY: [FeatureName; 3] = [
        FeatureName::Pmar,
        FeatureName::BollingerBandsRatio,
        FeatureName::PctFromTwentyDayLow,
    ];
}

impl fmt::Display for FeatureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureName::Pmar => "PMAR",
            FeatureName::BollingerBandsRatio => "BollingerBandsRatio",
            FeatureName::Rsi => "RSI",
            FeatureName::Macd => "MACD",
            FeatureName::PctFromTwentyDayLow => "PctFromTwentyDayLow",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureParams {
    pub lookback_window: usize,
    pub bollinger_k: f64,
    pub macd: MacdParams,
}

impl Default for FeatureParams {
    fn default() -> Self {
        FeatureParams {
            lookback_window: DEFAULT_LOOKBACK_WINDOW,
            bollinger_k: bollinger::DEFAULT_K,
            macd: MacdParams::default(),
        }
    }
}

impl FeatureParams {
    /// Observations a series needs before `name` can be defined.
    pub fn required_observations(&self, name: FeatureName) -> usize {
        match name {
            FeatureName::Macd => self.macd.warmup(),
            _ => self.lookback_window,
        }
    }
}

/// Feature values of one symbol at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub timestamp: NaiveDateTime,
    /// Observations of the series up to and including `timestamp`.
    pub observations: usize,
    pub pmar: Option<f64>,
    pub bollinger_ratio: Option<f64>,
    pub rsi: Option<f64>,
    pub macd: Option<f64>,
    pub pct_from_low: Option<f64>,
}

impl FeatureVector {
    pub fn get(&self, name: FeatureName) -> Option<f64> {
        match name {
            FeatureName::Pmar => self.pmar,
            FeatureName::BollingerBandsRatio => self.bollinger_ratio,
            FeatureName::Rsi => self.rsi,
            FeatureName::Macd => self.macd,
            FeatureName::PctFromTwentyDayLow => self.pct_from_low,
        }
    }

    /// Why `name` is missing, or `None` when it is defined.
    pub fn gap(&self, name: FeatureName, params: &FeatureParams) -> Option<GapReason> {
        if self.get(name).is_some() {
            None
        } else if self.observations < params.required_observations(name) {
            Some(GapReason::InsufficientHistory)
        } else {
            Some(GapReason::DegenerateWindow)
        }
    }

    pub fn is_fully_defined(&self) -> bool {
        FeatureName::ALL.iter().all(|&n| self.get(n).is_some())
    }
}

pub fn compute_features(series: &PriceSeries, params: &FeatureParams) -> Vec<FeatureVector> {
    if series.is_empty() {
        return Vec::new();
    }

    let closes = series.closes();
    let window = params.lookback_window;

    let sma = calculate_sma(&closes, window);
    let bands = calculate_bollinger(&closes, window, params.bollinger_k);
    let rsi = calculate_cumulative_rsi(&closes, window);
    let macd = calculate_macd(&closes, &params.macd);
    let low = calculate_rolling_min(&closes, window);

    series
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let close = point.close;
            FeatureVector {
                timestamp: point.timestamp,
                observations: i + 1,
                pmar: sma[i].and_then(|m| checked_ratio(close, m)),
                bollinger_ratio: bands[i].and_then(|b| b.ratio(close)),
                rsi: rsi[i],
                macd: macd[i].map(|m| m.histogram),
                pct_from_low: low[i].and_then(|l| checked_ratio(close - l, l)),
            }
        })
        .collect()
}

/// Feature vectors for every symbol of a panel, aligned with each price series.
#[derive(Debug, Clone, Default)]
pub struct FeatureTable {
    by_symbol: IndexMap<String, Vec<FeatureVector>>,
}

impl FeatureTable {
    pub fn symbol_count(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn get(&self, symbol: &str) -> Option<&[FeatureVector]> {
        self.by_symbol.get(symbol).map(Vec::as_slice)
    }

    /// The vector of `symbol` observed exactly at `timestamp`.
    pub fn at(&self, symbol: &str, timestamp: NaiveDateTime) -> Option<&FeatureVector> {
        let vectors = self.by_symbol.get(symbol)?;
        vectors
            .binary_search_by_key(&timestamp, |v| v.timestamp)
            .ok()
            .map(|i| &vectors[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FeatureVector])> {
        self.by_symbol
            .iter()
            .map(|(symbol, vectors)| (symbol.as_str(), vectors.as_slice()))
    }
}

pub fn compute_feature_table(panel: &Panel, params: &FeatureParams) -> FeatureTable {
    let series: Vec<&PriceSeries> = panel.series().collect();

    let computed: Vec<(String, Vec<FeatureVector>)> = series
        .par_iter()
        .map(|s| (s.symbol().to_string(), compute_features(s, params)))
        .collect();

    debug!(
        symbols = computed.len(),
        rows = computed.iter().map(|(_, v)| v.len()).sum::<usize>(),
        "computed feature table"
    );

    FeatureTable {
        by_symbol: computed.into_iter().collect(),
    }
}
