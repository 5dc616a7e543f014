//! Domain error types.

use chrono::NaiveDateTime;

/// Why a feature value is missing at a given observation.
///
/// These are recovered locally (the value becomes `None`) and only surface
/// as step exclusions; they never abort a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapReason {
    /// Fewer observations than the feature's lookback.
    InsufficientHistory,
    /// Enough history, but a denominator was zero (flat window, zero mean).
    DegenerateWindow,
}

/// Top-level error type for meanrev.
#[derive(Debug, thiserror::Error)]
pub enum MeanrevError {
    #[error("panel is empty: {reason}")]
    EmptyPanel { reason: String },

    #[error("malformed panel for {symbol}: {reason}")]
    MalformedPanel { symbol: String, reason: String },

    #[error("invalid selection{}: {reason}", at_suffix(.timestamp))]
    InvalidSelection {
        timestamp: Option<NaiveDateTime>,
        symbol: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn at_suffix(timestamp: &Option<NaiveDateTime>) -> String {
    match timestamp {
        Some(ts) => format!(" at {ts}"),
        None => String::new(),
    }
}

impl MeanrevError {
    pub fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MeanrevError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn data(reason: impl Into<String>) -> Self {
        MeanrevError::Data {
            reason: reason.into(),
        }
    }
}

impl From<csv::Error> for MeanrevError {
    fn from(err: csv::Error) -> Self {
        MeanrevError::Data {
            reason: format!("CSV error: {err}"),
        }
    }
}

impl MeanrevError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            MeanrevError::Io(_) => 1,
            MeanrevError::ConfigParse { .. }
            | MeanrevError::ConfigMissing { .. }
            | MeanrevError::ConfigInvalid { .. } => 2,
            MeanrevError::Data { .. } | MeanrevError::MalformedPanel { .. } => 3,
            MeanrevError::InvalidSelection { .. } => 4,
            MeanrevError::EmptyPanel { .. } => 5,
        }
    }
}

impl From<&MeanrevError> for std::process::ExitCode {
    fn from(err: &MeanrevError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
