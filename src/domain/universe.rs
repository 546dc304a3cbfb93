//! Multi-instrument runs.
//!
//! Parses code lists from configuration, loads one validated series per code
//! (skipping codes without usable data), and backtests each instrument
//! independently. Instruments share nothing, so they run on the rayon pool.

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::warn;

use crate::domain::backtest::{BacktestResult, run_backtest};
use crate::domain::error::MeanrevError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::strategy::StrategyParams;
use crate::ports::data_port::DataPort;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),

    #[error("all codes failed validation")]
    AllCodesFailed,
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    pub instruments: Vec<(String, PriceSeries)>,
    pub skipped: Vec<SkippedCode>,
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    FetchFailed(String),
    NoData,
    InvalidSeries(String),
}

pub fn load_universe(
    data_port: &dyn DataPort,
    codes: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadedUniverse, MeanrevError> {
    let mut instruments = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let reason = match data_port.fetch_bars(code, start_date, end_date) {
            Err(e) => SkipReason::FetchFailed(e.to_string()),
            Ok(bars) if bars.is_empty() => SkipReason::NoData,
            Ok(bars) => match PriceSeries::new(bars) {
                Ok(series) => {
                    instruments.push((code.clone(), series));
                    continue;
                }
                Err(e) => SkipReason::InvalidSeries(e.to_string()),
            },
        };

        warn!(code = %code, reason = ?reason, "skipping instrument");
        skipped.push(SkippedCode {
            code: code.clone(),
            reason,
        });
    }

    if instruments.is_empty() {
        return Err(UniverseError::AllCodesFailed.into());
    }

    Ok(LoadedUniverse {
        instruments,
        skipped,
    })
}

/// Backtests every instrument in parallel; results come back in input order.
pub fn backtest_universe(
    instruments: &[(String, PriceSeries)],
    params: &StrategyParams,
    risk_free_rate: f64,
) -> Vec<Result<BacktestResult, MeanrevError>> {
    instruments
        .par_iter()
        .map(|(code, series)| run_backtest(code, series, params, risk_free_rate))
        .collect()
}

/// Cross-instrument aggregate over the instruments that produced a result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniverseSummary {
    pub total_tickers: usize,
    pub successful_tickers: usize,
    pub total_trades: usize,
    pub avg_win_rate: f64,
    pub avg_return: f64,
    pub profitable_tickers: usize,
}

impl UniverseSummary {
    pub fn from_results(total_tickers: usize, results: &[BacktestResult]) -> Self {
        let successful = results.len();
        let (avg_win_rate, avg_return) = if successful > 0 {
            let n = successful as f64;
            (
                results.iter().map(|r| r.summary.win_rate).sum::<f64>() / n,
                results.iter().map(|r| r.summary.avg_return).sum::<f64>() / n,
            )
        } else {
            (0.0, 0.0)
        };

        Self {
            total_tickers,
            successful_tickers: successful,
            total_trades: results.iter().map(|r| r.summary.total_trades).sum(),
            avg_win_rate,
            avg_return,
            profitable_tickers: results
                .iter()
                .filter(|r| r.summary.avg_return > 0.0)
                .count(),
        }
    }
}
