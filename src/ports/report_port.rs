//! Report output port trait.

use crate::domain::backtest::{ReturnSeries, StepRecord};
use crate::domain::error::MeanrevError;
use crate::domain::features::FeatureTable;

/// Port for writing backtest artifacts.
pub trait ReportPort {
    fn write_returns(&self, returns: &ReturnSeries, output_path: &str)
        -> Result<(), MeanrevError>;

    fn write_features(&self, table: &FeatureTable, output_path: &str) -> Result<(), MeanrevError>;

    fn write_selection_log(
        &self,
        steps: &[StepRecord],
        output_path: &str,
    ) -> Result<(), MeanrevError>;
}
