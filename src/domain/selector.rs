//! Cross-sectional ranking and basket selection.
//!
//! Composite key: (PMAR, BollingerBandsRatio, PctFromTwentyDayLow), ascending,
//! compared lexicographically. Ties keep panel order. Symbols missing any key
//! feature are excluded for the step and reported with the reason.

use chrono::NaiveDateTime;
use std::cmp::Ordering;
use std::fmt;

use super::error::GapReason;
use super::features::{FeatureName, FeatureParams, FeatureVector};

pub const DEFAULT_SELECTION_SIZE: usize = 10;

/// One symbol's features at the step timestamp, in panel order.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub symbol: &'a str,
    pub features: &'a FeatureVector,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSet {
    pub timestamp: NaiveDateTime,
    pub symbols: Vec<String>,
}

impl SelectionSet {
    pub fn new(timestamp: NaiveDateTime, symbols: Vec<String>) -> Self {
        SelectionSet { timestamp, symbols }
    }

    pub fn empty(timestamp: NaiveDateTime) -> Self {
        SelectionSet::new(timestamp, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExclusionReason {
    /// The symbol has no price at the step timestamp.
    NoObservation,
    MissingFeature {
        feature: FeatureName,
        gap: GapReason,
    },
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NoObservation => f.write_str("no observation"),
            ExclusionReason::MissingFeature {
                feature,
                gap: GapReason::InsufficientHistory,
            } => write!(f, "{feature} undefined: insufficient history"),
            ExclusionReason::MissingFeature {
                feature,
                gap: GapReason::DegenerateWindow,
            } => write!(f, "{feature} undefined: degenerate window"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exclusion {
    pub symbol: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    pub selection: SelectionSet,
    pub exclusions: Vec<Exclusion>,
}

/// Chooses the basket for one timestamp from the full cross-section.
pub trait Ranker {
    fn rank(&self, timestamp: NaiveDateTime, candidates: &[Candidate<'_>]) -> Ranking;
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeRanker {
    pub selection_size: usize,
    pub params: FeatureParams,
}

impl CompositeRanker {
    pub fn new(selection_size: usize, params: FeatureParams) -> Self {
        CompositeRanker {
            selection_size,
            params,
        }
    }

    fn key(&self, features: &FeatureVector) -> Result<[f64; 3], ExclusionReason> {
        let mut key = [0.0; 3];
        for (slot, name) in key.iter_mut().zip(FeatureName::RANKING_KEY) {
            match features.get(name) {
                Some(value) => *slot = value,
                None => {
                    let gap = features
                        .gap(name, &self.params)
                        .unwrap_or(GapReason::DegenerateWindow);
                    return Err(ExclusionReason::MissingFeature { feature: name, gap });
                }
            }
        }
        Ok(key)
    }
}

impl Default for CompositeRanker {
    fn default() -> Self {
        CompositeRanker::new(DEFAULT_SELECTION_SIZE, FeatureParams::default())
    }
}

fn compare_keys(a: &[f64; 3], b: &[f64; 3]) -> Ordering {
    a.iter()
        .zip(b)
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl Ranker for CompositeRanker {
    fn rank(&self, timestamp: NaiveDateTime, candidates: &[Candidate<'_>]) -> Ranking {
        let mut eligible: Vec<(&str, [f64; 3])> = Vec::with_capacity(candidates.len());
        let mut exclusions = Vec::new();

        for candidate in candidates {
            match self.key(candidate.features) {
                Ok(key) => eligible.push((candidate.symbol, key)),
                Err(reason) => exclusions.push(Exclusion {
                    symbol: candidate.symbol.to_string(),
                    reason,
                }),
            }
        }

        // sort_by is stable, so equal keys stay in panel order
        eligible.sort_by(|a, b| compare_keys(&a.1, &b.1));
        eligible.truncate(self.selection_size);

        let symbols = eligible.into_iter().map(|(s, _)| s.to_string()).collect();
        Ranking {
            selection: SelectionSet::new(timestamp, symbols),
            exclusions,
        }
    }
}
