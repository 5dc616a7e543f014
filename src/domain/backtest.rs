//! Backtest loop over the unified panel timeline.
//!
//! At each timestamp t:
//! 1. gather the cross-section of symbols observed at t
//! 2. rank it into SelectionSet(t)
//! 3. rebalance Portfolio(t-1) into Portfolio(t)
//! 4. period return = Σ w(t-1, s) × (close(t, s) / close(t-1, s) - 1), using the
//!    latest known close of each held symbol
//!
//! The first period return is 0. An invalid selection stops the run and hands
//! back everything computed before t.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use super::error::MeanrevError;
use super::features::{FeatureParams, FeatureTable, FeatureVector};
use super::panel::Panel;
use super::portfolio::{
    rebalance, LiquidationPolicy, Portfolio, DEFAULT_NOMINAL_POSITION_SIZE,
};
use super::selector::{
    Candidate, Exclusion, ExclusionReason, Ranker, SelectionSet, DEFAULT_SELECTION_SIZE,
};

pub const DEFAULT_INITIAL_VALUE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub features: FeatureParams,
    pub selection_size: usize,
    pub nominal_position_size: u64,
    pub liquidation: LiquidationPolicy,
    pub initial_value: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            features: FeatureParams::default(),
            selection_size: DEFAULT_SELECTION_SIZE,
            nominal_position_size: DEFAULT_NOMINAL_POSITION_SIZE,
            liquidation: LiquidationPolicy::default(),
            initial_value: DEFAULT_INITIAL_VALUE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub timestamp: NaiveDateTime,
    pub period_return: f64,
    pub cumulative_return: f64,
}

/// Append-only sequence of period and cumulative returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnSeries {
    points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn new() -> Self {
        ReturnSeries::default()
    }

    /// Appends a period return; cumulative = Π(1 + r) - 1 over all points.
    pub fn push(&mut self, timestamp: NaiveDateTime, period_return: f64) {
        let growth = self.last().map_or(1.0, |p| 1.0 + p.cumulative_return);
        self.points.push(ReturnPoint {
            timestamp,
            period_return,
            cumulative_return: growth * (1.0 + period_return) - 1.0,
        });
    }

    pub fn points(&self) -> &[ReturnPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&ReturnPoint> {
        self.points.last()
    }

    pub fn period_returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.period_return).collect()
    }

    pub fn cumulative_return(&self) -> f64 {
        self.last().map_or(0.0, |p| p.cumulative_return)
    }
}

/// Diagnostics for one step of the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub timestamp: NaiveDateTime,
    pub selection: SelectionSet,
    pub exclusions: Vec<Exclusion>,
    pub portfolio: Portfolio,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub returns: ReturnSeries,
    pub steps: Vec<StepRecord>,
    /// Holdings after the last completed step.
    pub portfolio: Portfolio,
    pub final_value: f64,
}

impl BacktestResult {
    fn start(initial_value: f64) -> Self {
        BacktestResult {
            returns: ReturnSeries::new(),
            steps: Vec::new(),
            portfolio: Portfolio::new(),
            final_value: initial_value,
        }
    }
}

/// An aborted run: the error plus everything completed before it.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct BacktestFailure {
    pub partial: BacktestResult,
    pub error: MeanrevError,
}

fn fail(partial: BacktestResult, error: MeanrevError) -> BacktestFailure {
    BacktestFailure { partial, error }
}

/// Per-symbol walk over one series, advanced in lockstep with the timeline.
struct Cursor<'a> {
    symbol: &'a str,
    closes: Vec<f64>,
    timestamps: Vec<NaiveDateTime>,
    features: &'a [FeatureVector],
    next: usize,
    last_close: Option<f64>,
}

impl<'a> Cursor<'a> {
    /// Consumes the observation at `t`, if the series has one.
    fn advance(&mut self, t: NaiveDateTime) -> Option<&'a FeatureVector> {
        if self.timestamps.get(self.next) != Some(&t) {
            return None;
        }
        let features = self.features;
        let vector = &features[self.next];
        self.last_close = Some(self.closes[self.next]);
        self.next += 1;
        Some(vector)
    }
}

fn build_cursors<'a>(
    panel: &'a Panel,
    features: &'a FeatureTable,
) -> Result<Vec<Cursor<'a>>, MeanrevError> {
    panel
        .series()
        .map(|series| {
            let rows = features.get(series.symbol()).unwrap_or(&[]);
            if rows.len() != series.len() {
                return Err(MeanrevError::data(format!(
                    "feature table has {} rows for {} but the panel has {}",
                    rows.len(),
                    series.symbol(),
                    series.len()
                )));
            }
            Ok(Cursor {
                symbol: series.symbol(),
                closes: series.closes(),
                timestamps: series.timestamps().collect(),
                features: rows,
                next: 0,
                last_close: None,
            })
        })
        .collect()
}

fn period_return(
    portfolio: &Portfolio,
    panel: &Panel,
    previous: &[Option<f64>],
    cursors: &[Cursor<'_>],
) -> f64 {
    portfolio
        .holdings()
        .filter_map(|(symbol, holding)| {
            let i = panel.index_of(symbol)?;
            let before = previous[i]?;
            let now = cursors[i].last_close?;
            let relative = now / before - 1.0;
            relative.is_finite().then_some(holding.weight * relative)
        })
        .sum()
}

pub fn run_backtest(
    panel: &Panel,
    features: &FeatureTable,
    ranker: &dyn Ranker,
    config: &BacktestConfig,
) -> Result<BacktestResult, BacktestFailure> {
    let mut result = BacktestResult::start(config.initial_value);

    if panel.is_empty() {
        return Err(fail(
            result,
            MeanrevError::EmptyPanel {
                reason: "no price observations".into(),
            },
        ));
    }

    let mut cursors = match build_cursors(panel, features) {
        Ok(c) => c,
        Err(e) => return Err(fail(result, e)),
    };

    let timeline = panel.timeline();
    info!(
        symbols = panel.symbol_count(),
        timestamps = timeline.len(),
        selection_size = config.selection_size,
        liquidation = %config.liquidation,
        "starting backtest"
    );

    let mut value = config.initial_value;

    for &t in &timeline {
        let previous: Vec<Option<f64>> = cursors.iter().map(|c| c.last_close).collect();

        let mut candidates = Vec::with_capacity(cursors.len());
        let mut exclusions = Vec::new();
        for cursor in cursors.iter_mut() {
            match cursor.advance(t) {
                Some(vector) => candidates.push(Candidate {
                    symbol: cursor.symbol,
                    features: vector,
                }),
                None => exclusions.push(Exclusion {
                    symbol: cursor.symbol.to_string(),
                    reason: ExclusionReason::NoObservation,
                }),
            }
        }

        let r = if result.returns.is_empty() {
            0.0
        } else {
            period_return(&result.portfolio, panel, &previous, &cursors)
        };

        let ranking = ranker.rank(t, &candidates);
        exclusions.extend(ranking.exclusions);
        for exclusion in &exclusions {
            debug!(timestamp = %t, symbol = %exclusion.symbol, reason = %exclusion.reason, "excluded");
        }

        let next = match rebalance(
            &result.portfolio,
            &ranking.selection,
            config.nominal_position_size,
            config.liquidation,
        ) {
            Ok(p) => p,
            Err(e) => return Err(fail(result, e)),
        };

        value *= 1.0 + r;
        result.returns.push(t, r);
        debug!(
            timestamp = %t,
            selected = ranking.selection.len(),
            period_return = r,
            "step"
        );

        result.steps.push(StepRecord {
            timestamp: t,
            selection: ranking.selection,
            exclusions,
            portfolio: next.clone(),
        });
        result.portfolio = next;
        result.final_value = value;
    }

    info!(
        periods = result.returns.len(),
        cumulative_return = result.returns.cumulative_return(),
        final_value = result.final_value,
        "backtest complete"
    );

    Ok(result)
}
