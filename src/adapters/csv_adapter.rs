//! CSV panel adapter.
//!
//! Reads the flat price history export
//! (`date,time,code,open,high,low,close,volume,amount,adjustflag`) and
//! optionally renames codes through a symbol-name table such as the CSI 500
//! constituent list (`updateDate,code,code_name,english_code`).

use crate::domain::error::MeanrevError;
use crate::domain::panel::Panel;
use crate::domain::price::PricePoint;
use crate::ports::panel_port::PanelPort;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
struct PanelRow {
    date: String,
    #[serde(default)]
    time: Option<String>,
    code: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    open: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    high: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    low: Option<f64>,
    close: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    volume: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<f64>,
}

#[derive(Debug, Clone)]
struct NameTable {
    path: PathBuf,
    column: String,
}

pub struct CsvPanelAdapter {
    panel_path: PathBuf,
    names: Option<NameTable>,
}

impl CsvPanelAdapter {
    pub fn new(panel_path: impl Into<PathBuf>) -> Self {
        Self {
            panel_path: panel_path.into(),
            names: None,
        }
    }

    /// Joins rows on `code` against `path`, using `column` as the symbol.
    pub fn with_names(mut self, path: impl Into<PathBuf>, column: impl Into<String>) -> Self {
        self.names = Some(NameTable {
            path: path.into(),
            column: column.into(),
        });
        self
    }
}

fn open_reader(path: &Path) -> Result<csv::Reader<std::fs::File>, MeanrevError> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| MeanrevError::data(format!("failed to read {}: {}", path.display(), e)))
}

/// Parses a `YYYYMMDDhhmmss[fff]` stamp, falling back to `date` at midnight.
pub fn parse_timestamp(date: &str, time: Option<&str>) -> Result<NaiveDateTime, MeanrevError> {
    if let Some(time) = time.map(str::trim).filter(|t| !t.is_empty()) {
        if time.len() < 14 || !time.is_ascii() {
            return Err(MeanrevError::data(format!("invalid time value '{time}'")));
        }
        let (head, millis) = time.split_at(14);
        let mut ts = NaiveDateTime::parse_from_str(head, "%Y%m%d%H%M%S")
            .map_err(|e| MeanrevError::data(format!("invalid time value '{time}': {e}")))?;
        if !millis.is_empty() {
            let ms: i64 = millis
                .parse()
                .map_err(|e| MeanrevError::data(format!("invalid time value '{time}': {e}")))?;
            ts += Duration::milliseconds(ms);
        }
        return Ok(ts);
    }

    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|e| MeanrevError::data(format!("invalid date format '{date}': {e}")))
}

fn read_name_table(table: &NameTable) -> Result<HashMap<String, String>, MeanrevError> {
    let mut rdr = open_reader(&table.path)?;
    let headers = rdr.headers()?.clone();
    let position = |name: &str| {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            MeanrevError::data(format!(
                "{} has no '{}' column",
                table.path.display(),
                name
            ))
        })
    };
    let code_idx = position("code")?;
    let name_idx = position(table.column.as_str())?;

    let mut names = HashMap::new();
    let mut owners: HashMap<String, String> = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        if let (Some(code), Some(name)) = (record.get(code_idx), record.get(name_idx)) {
            if name.is_empty() {
                continue;
            }
            // two codes sharing a name would merge into one series
            if let Some(owner) = owners.get(name).filter(|owner| owner.as_str() != code) {
                return Err(MeanrevError::data(format!(
                    "{}: codes {} and {} both map to '{}'",
                    table.path.display(),
                    owner,
                    code,
                    name
                )));
            }
            owners.insert(name.to_string(), code.to_string());
            names.insert(code.to_string(), name.to_string());
        }
    }
    Ok(names)
}

impl PanelPort for CsvPanelAdapter {
    fn load_panel(&self) -> Result<Panel, MeanrevError> {
        let names = self.names.as_ref().map(read_name_table).transpose()?;

        let mut rdr = open_reader(&self.panel_path)?;
        let mut points = Vec::new();
        let mut unmatched: HashMap<String, usize> = HashMap::new();

        for (record, row) in rdr.deserialize::<PanelRow>().enumerate() {
            let row = row?;

            let symbol = match &names {
                None => row.code.clone(),
                Some(names) => match names.get(&row.code) {
                    Some(name) => name.clone(),
                    None => {
                        *unmatched.entry(row.code.clone()).or_default() += 1;
                        continue;
                    }
                },
            };

            let timestamp = parse_timestamp(&row.date, row.time.as_deref())?;
            let close: f64 = row.close.parse().map_err(|e| {
                MeanrevError::data(format!(
                    "invalid close value '{}' for {} in record {}: {}",
                    row.close,
                    row.code,
                    record + 1,
                    e
                ))
            })?;

            points.push(PricePoint {
                symbol,
                timestamp,
                close,
                open: row.open,
                high: row.high,
                low: row.low,
                volume: row.volume,
                amount: row.amount,
            });
        }

        if !unmatched.is_empty() {
            for (code, rows) in &unmatched {
                debug!(code = %code, rows, "code missing from name table");
            }
            warn!(
                codes = unmatched.len(),
                rows = unmatched.values().sum::<usize>(),
                "dropped rows without a name mapping"
            );
        }

        let panel = Panel::from_points(points)?;
        info!(
            path = %self.panel_path.display(),
            symbols = panel.symbol_count(),
            observations = panel.observation_count(),
            "loaded panel"
        );
        Ok(panel)
    }
}
