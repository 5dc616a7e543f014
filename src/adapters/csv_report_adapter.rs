//! CSV report adapter implementing ReportPort.
//!
//! Undefined feature values are written as empty cells.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::path::Path;

use crate::domain::backtest::{ReturnSeries, StepRecord};
use crate::domain::error::MeanrevError;
use crate::domain::features::FeatureTable;
use crate::ports::report_port::ReportPort;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

#[derive(Serialize)]
struct ReturnRow {
    timestamp: String,
    period_return: f64,
    cumulative_return: f64,
}

#[derive(Serialize)]
struct FeatureRow<'a> {
    symbol: &'a str,
    timestamp: String,
    #[serde(rename = "PMAR")]
    pmar: Option<f64>,
    #[serde(rename = "BollingerBandsRatio")]
    bollinger_ratio: Option<f64>,
    #[serde(rename = "RSI")]
    rsi: Option<f64>,
    #[serde(rename = "MACD")]
    macd: Option<f64>,
    #[serde(rename = "PctFromTwentyDayLow")]
    pct_from_low: Option<f64>,
}

#[derive(Serialize)]
struct SelectionRow<'a> {
    timestamp: String,
    rank: usize,
    symbol: &'a str,
    weight: f64,
}

fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

fn write_error(err: csv::Error) -> MeanrevError {
    match err.into_kind() {
        csv::ErrorKind::Io(e) => MeanrevError::Io(e),
        other => MeanrevError::data(format!("CSV write error: {other:?}")),
    }
}

fn write_rows<T, I>(output_path: &str, rows: I) -> Result<(), MeanrevError>
where
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    let mut writer = csv::Writer::from_path(Path::new(output_path)).map_err(write_error)?;
    for row in rows {
        writer.serialize(row).map_err(write_error)?;
    }
    writer.flush()?;
    Ok(())
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write_returns(
        &self,
        returns: &ReturnSeries,
        output_path: &str,
    ) -> Result<(), MeanrevError> {
        let rows = returns.points().iter().map(|p| ReturnRow {
            timestamp: format_timestamp(p.timestamp),
            period_return: p.period_return,
            cumulative_return: p.cumulative_return,
        });
        write_rows(output_path, rows)
    }

    fn write_features(&self, table: &FeatureTable, output_path: &str) -> Result<(), MeanrevError> {
        let rows = table.iter().flat_map(|(symbol, vectors)| {
            vectors.iter().map(move |v| FeatureRow {
                symbol,
                timestamp: format_timestamp(v.timestamp),
                pmar: v.pmar,
                bollinger_ratio: v.bollinger_ratio,
                rsi: v.rsi,
                macd: v.macd,
                pct_from_low: v.pct_from_low,
            })
        });
        write_rows(output_path, rows)
    }

    fn write_selection_log(
        &self,
        steps: &[StepRecord],
        output_path: &str,
    ) -> Result<(), MeanrevError> {
        let rows = steps.iter().flat_map(|step| {
            step.selection
                .symbols
                .iter()
                .enumerate()
                .map(move |(i, symbol)| SelectionRow {
                    timestamp: format_timestamp(step.timestamp),
                    rank: i + 1,
                    symbol,
                    weight: step.portfolio.weight(symbol),
                })
        });
        write_rows(output_path, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::features::{compute_feature_table, FeatureParams};
    use crate::domain::panel::Panel;
    use crate::domain::portfolio::Portfolio;
    use crate::domain::price::PricePoint;
    use crate::domain::selector::SelectionSet;
    use chrono::NaiveDate;
    use std::fs;
    use tempfile::TempDir;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 4, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn out(dir: &TempDir, name: &str) -> String {
        dir.path().join(name).to_string_lossy().into_owned()
    }

    #[test]
    fn writes_returns() {
        let dir = TempDir::new().unwrap();
        let path = out(&dir, "returns.csv");
        let mut returns = ReturnSeries::new();
        returns.push(ts(1), 0.0);
        returns.push(ts(2), 0.5);

        CsvReportAdapter.write_returns(&returns, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,period_return,cumulative_return");
        assert_eq!(lines[1], "2022-04-01 10:00:00,0.0,0.0");
        assert_eq!(lines[2], "2022-04-02 10:00:00,0.5,0.5");
    }

    #[test]
    fn writes_features_with_empty_cells() {
        let dir = TempDir::new().unwrap();
        let path = out(&dir, "features.csv");
        let panel = Panel::from_points(vec![
            PricePoint::close_only("A", ts(1), 10.0),
            PricePoint::close_only("A", ts(2), 11.0),
        ])
        .unwrap();
        let table = compute_feature_table(&panel, &FeatureParams::default());

        CsvReportAdapter.write_features(&table, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "symbol,timestamp,PMAR,BollingerBandsRatio,RSI,MACD,PctFromTwentyDayLow"
        );
        assert_eq!(lines[1], "A,2022-04-01 10:00:00,,,,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn writes_selection_log() {
        let dir = TempDir::new().unwrap();
        let path = out(&dir, "selection.csv");
        let steps = vec![StepRecord {
            timestamp: ts(1),
            selection: SelectionSet::new(ts(1), vec!["B".into(), "A".into()]),
            exclusions: Vec::new(),
            portfolio: Portfolio::from_quantities([("B", 100), ("A", 100)]),
        }];

        CsvReportAdapter.write_selection_log(&steps, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "timestamp,rank,symbol,weight");
        assert_eq!(lines[1], "2022-04-01 10:00:00,1,B,0.5");
        assert_eq!(lines[2], "2022-04-01 10:00:00,2,A,0.5");
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = out(&dir, "missing/returns.csv");
        let err = CsvReportAdapter
            .write_returns(&ReturnSeries::new(), &path)
            .unwrap_err();
        assert!(matches!(err, MeanrevError::Io(_)));
    }
}
