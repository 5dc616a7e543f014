//! Price observations and per-symbol price series.

use chrono::NaiveDateTime;

use super::error::MeanrevError;

#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub close: f64,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub volume: Option<f64>,
    pub amount: Option<f64>,
}

impl PricePoint {
    /// A close-only observation.
    pub fn close_only(symbol: impl Into<String>, timestamp: NaiveDateTime, close: f64) -> Self {
        PricePoint {
            symbol: symbol.into(),
            timestamp,
            close,
            open: None,
            high: None,
            low: None,
            volume: None,
            amount: None,
        }
    }
}

/// Ordered observations of a single symbol with strictly increasing timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Sorts `points` chronologically and checks the series invariants:
    /// every point belongs to `symbol`, timestamps are unique, closes are finite.
    pub fn new(symbol: impl Into<String>, mut points: Vec<PricePoint>) -> Result<Self, MeanrevError> {
        let symbol = symbol.into();
        points.sort_by_key(|p| p.timestamp);

        for point in &points {
            if point.symbol != symbol {
                return Err(MeanrevError::MalformedPanel {
                    symbol,
                    reason: format!("foreign observation for {}", point.symbol),
                });
            }
            if !point.close.is_finite() {
                return Err(MeanrevError::MalformedPanel {
                    symbol,
                    reason: format!("non-finite close at {}", point.timestamp),
                });
            }
        }

        if let Some(pair) = points.windows(2).find(|w| w[0].timestamp == w[1].timestamp) {
            return Err(MeanrevError::MalformedPanel {
                symbol,
                reason: format!("duplicate timestamp {}", pair[0].timestamp),
            });
        }

        Ok(PriceSeries { symbol, points })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.points.iter().map(|p| p.timestamp)
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.points.last().map(|p| p.timestamp)
    }
}
