//! Run history storage port.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::MeanrevError;
use crate::domain::history::{RunDetails, RunMetadata, StoredRun, TickerStatistics};

pub trait PersistencePort {
    /// Stores a run with its per-instrument results and trades, returning the run id.
    fn persist(
        &self,
        metadata: &RunMetadata,
        results: &[BacktestResult],
    ) -> Result<i64, MeanrevError>;

    /// Most recent runs first.
    fn recent_runs(&self, limit: usize) -> Result<Vec<StoredRun>, MeanrevError>;

    fn run_details(&self, run_id: i64) -> Result<Option<RunDetails>, MeanrevError>;

    /// Aggregate of `code`'s per-run results over runs from the last `days` days;
    /// `None` when no such run exists.
    fn ticker_statistics(
        &self,
        code: &str,
        days: i64,
    ) -> Result<Option<TickerStatistics>, MeanrevError>;
}
