//! Multi-symbol price panel and unified timeline.

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use std::collections::BTreeSet;

use super::error::MeanrevError;
use super::price::{PricePoint, PriceSeries};

/// All price series of a backtest, keyed by symbol in first-appearance order.
///
/// The insertion order is the "original symbol order" that ranking ties
/// fall back to.
#[derive(Debug, Clone, Default)]
pub struct Panel {
    series: IndexMap<String, PriceSeries>,
}

impl Panel {
    /// Groups flat rows by symbol, keeping the order in which symbols first appear.
    pub fn from_points(points: Vec<PricePoint>) -> Result<Self, MeanrevError> {
        let mut grouped: IndexMap<String, Vec<PricePoint>> = IndexMap::new();
        for point in points {
            grouped.entry(point.symbol.clone()).or_default().push(point);
        }

        let mut series = IndexMap::with_capacity(grouped.len());
        for (symbol, points) in grouped {
            let s = PriceSeries::new(symbol.clone(), points)?;
            series.insert(symbol, s);
        }
        Ok(Panel { series })
    }

    pub fn from_series(list: Vec<PriceSeries>) -> Result<Self, MeanrevError> {
        let mut series = IndexMap::with_capacity(list.len());
        for s in list {
            let symbol = s.symbol().to_string();
            if series.contains_key(&symbol) {
                return Err(MeanrevError::MalformedPanel {
                    symbol,
                    reason: "symbol appears in more than one series".into(),
                });
            }
            series.insert(symbol, s);
        }
        Ok(Panel { series })
    }

    pub fn symbol_count(&self) -> usize {
        self.series.len()
    }

    pub fn observation_count(&self) -> usize {
        self.series.values().map(PriceSeries::len).sum()
    }

    /// True when the panel holds no observations at all.
    pub fn is_empty(&self) -> bool {
        self.observation_count() == 0
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn series(&self) -> impl Iterator<Item = &PriceSeries> {
        self.series.values()
    }

    pub fn get(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    pub fn get_index(&self, index: usize) -> Option<&PriceSeries> {
        self.series.get_index(index).map(|(_, s)| s)
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.series.get_index_of(symbol)
    }

    /// Sorted union of every symbol's timestamps.
    pub fn timeline(&self) -> Vec<NaiveDateTime> {
        let unique: BTreeSet<NaiveDateTime> =
            self.series.values().flat_map(|s| s.timestamps()).collect();
        unique.into_iter().collect()
    }
}
