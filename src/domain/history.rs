//! Records describing stored backtest runs.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::domain::error::MeanrevError;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::position::Trade;
use crate::domain::strategy::StrategyParams;
use crate::domain::universe::UniverseSummary;

#[derive(Debug, Clone, PartialEq)]
pub struct RunMetadata {
    pub strategy_name: String,
    pub params: StrategyParams,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub codes: Vec<String>,
    pub run_at: NaiveDateTime,
}

/// One row of run history, newest first when listed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRun {
    pub id: i64,
    pub metadata: RunMetadata,
    pub summary: UniverseSummary,
}

/// Per-instrument headline figures kept alongside a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodePerformance {
    pub code: String,
    pub num_trades: usize,
    pub avg_return_pct: f64,
    pub win_rate_pct: f64,
    pub total_return_pct: f64,
    pub best_trade_pct: f64,
    pub worst_trade_pct: f64,
}

impl CodePerformance {
    pub fn from_summary(code: &str, summary: &PerformanceSummary) -> Self {
        Self {
            code: code.to_string(),
            num_trades: summary.total_trades,
            avg_return_pct: summary.avg_return,
            win_rate_pct: summary.win_rate * 100.0,
            total_return_pct: summary.total_return,
            best_trade_pct: summary.best_trade,
            worst_trade_pct: summary.worst_trade,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTrade {
    pub code: String,
    pub trade: Trade,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunDetails {
    pub run: StoredRun,
    pub performance: Vec<CodePerformance>,
    pub trades: Vec<StoredTrade>,
}

/// How one code has performed across the stored runs in a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerStatistics {
    pub code: String,
    pub backtest_count: usize,
    /// Mean of the per-run average trade returns, in percent.
    pub avg_return: f64,
    pub avg_win_rate_pct: f64,
    pub best_performance: f64,
    pub worst_performance: f64,
    /// `100 - 10 * stddev` of the per-run average returns; 100 for a single run.
    pub consistency_score: f64,
}

impl TickerStatistics {
    pub fn from_performances(code: &str, rows: &[CodePerformance]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let n = rows.len() as f64;
        let returns: Vec<f64> = rows.iter().map(|p| p.avg_return_pct).collect();
        let avg_return = returns.iter().sum::<f64>() / n;
        let avg_win_rate_pct = rows.iter().map(|p| p.win_rate_pct).sum::<f64>() / n;

        let spread = if rows.len() < 2 {
            0.0
        } else {
            let variance = returns
                .iter()
                .map(|r| (r - avg_return).powi(2))
                .sum::<f64>()
                / (n - 1.0);
            variance.sqrt()
        };

        Some(Self {
            code: code.to_string(),
            backtest_count: rows.len(),
            avg_return,
            avg_win_rate_pct,
            best_performance: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_performance: returns.iter().copied().fold(f64::INFINITY, f64::min),
            consistency_score: 100.0 - spread * 10.0,
        })
    }
}

/// Start of a history window of `days` ending at `now`.
pub fn history_cutoff(now: NaiveDateTime, days: i64) -> Result<NaiveDateTime, MeanrevError> {
    if days < 1 {
        return Err(MeanrevError::InvalidParameter {
            name: "days",
            reason: "must be at least 1".into(),
        });
    }
    Duration::try_days(days)
        .and_then(|span| now.checked_sub_signed(span))
        .ok_or_else(|| MeanrevError::InvalidParameter {
            name: "days",
            reason: format!("{days} days before {now} is out of range"),
        })
}
