//! Report output port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MeanrevError;
use crate::domain::universe::UniverseSummary;

pub trait ReportPort {
    fn write(
        &self,
        results: &[BacktestResult],
        summary: &UniverseSummary,
        output_dir: &Path,
    ) -> Result<(), MeanrevError>;
}
