#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use meanrev::domain::backtest::{ReturnSeries, StepRecord};
use meanrev::domain::error::MeanrevError;
use meanrev::domain::features::FeatureTable;
use meanrev::domain::panel::Panel;
use meanrev::domain::price::PricePoint;
use meanrev::ports::panel_port::PanelPort;
use meanrev::ports::report_port::ReportPort;
use std::cell::RefCell;

pub struct MockPanelPort {
    pub points: Vec<PricePoint>,
    pub error: Option<String>,
}

impl MockPanelPort {
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            error: None,
        }
    }

    pub fn with_closes(mut self, symbol: &str, closes: &[f64]) -> Self {
        self.points.extend(make_points(symbol, closes, 0));
        self
    }

    pub fn with_points(mut self, points: Vec<PricePoint>) -> Self {
        self.points.extend(points);
        self
    }

    pub fn with_error(mut self, reason: &str) -> Self {
        self.error = Some(reason.to_string());
        self
    }
}

impl PanelPort for MockPanelPort {
    fn load_panel(&self) -> Result<Panel, MeanrevError> {
        if let Some(reason) = &self.error {
            return Err(MeanrevError::Data {
                reason: reason.clone(),
            });
        }
        Panel::from_points(self.points.clone())
    }
}

/// Report port that remembers what it was asked to write.
#[derive(Default)]
pub struct RecordingReport {
    pub returns: RefCell<Vec<(String, ReturnSeries)>>,
    pub selection_logs: RefCell<Vec<(String, usize)>>,
    pub feature_tables: RefCell<Vec<(String, usize)>>,
}

impl ReportPort for RecordingReport {
    fn write_returns(&self, returns: &ReturnSeries, output_path: &str) -> Result<(), MeanrevError> {
        self.returns
            .borrow_mut()
            .push((output_path.to_string(), returns.clone()));
        Ok(())
    }

    fn write_features(&self, table: &FeatureTable, output_path: &str) -> Result<(), MeanrevError> {
        self.feature_tables
            .borrow_mut()
            .push((output_path.to_string(), table.symbol_count()));
        Ok(())
    }

    fn write_selection_log(
        &self,
        steps: &[StepRecord],
        output_path: &str,
    ) -> Result<(), MeanrevError> {
        self.selection_logs
            .borrow_mut()
            .push((output_path.to_string(), steps.len()));
        Ok(())
    }
}

pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 4, 1)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap()
        + Duration::days(i as i64)
}

pub fn make_points(symbol: &str, closes: &[f64], offset: usize) -> Vec<PricePoint> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::close_only(symbol, ts(i + offset), c))
        .collect()
}

pub fn rising(n: usize) -> Vec<f64> {
    (0..n).map(|i| 10.0 + i as f64).collect()
}

/// Flat around 20.0 with a small alternating wobble so the window is never degenerate.
pub fn flat_wobble(n: usize) -> Vec<f64> {
    (0..n).map(|i| 20.0 + 0.01 * (i % 2) as f64).collect()
}

pub fn falling(n: usize) -> Vec<f64> {
    (0..n).map(|i| 40.0 - i as f64).collect()
}

/// A rising, B flat, C falling over `n` shared timestamps.
pub fn three_symbol_panel(n: usize) -> Panel {
    let mut points = make_points("A", &rising(n), 0);
    points.extend(make_points("B", &flat_wobble(n), 0));
    points.extend(make_points("C", &falling(n), 0));
    Panel::from_points(points).unwrap()
}

/// Deterministic noisy walk, distinct per `seed`.
pub fn noisy_walk(n: usize, seed: u64) -> Vec<f64> {
    let mut price = 50.0 + seed as f64;
    (0..n)
        .map(|i| {
            let step = ((i as u64 * 7 + seed * 13) % 11) as f64 - 5.0;
            price = (price + step * 0.3).max(1.0);
            price
        })
        .collect()
}

pub fn write_temp(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}
