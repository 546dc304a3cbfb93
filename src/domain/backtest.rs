//! Single-position trade simulation.
//!
//! The simulator walks the bars once with two states, flat and in position.
//! An entry opens at the signal bar's close; each later bar either closes the
//! position (bracket hit, or the last bar) or holds. A bar that closes a
//! position is consumed by the exit and is never also an entry.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::error::MeanrevError;
use crate::domain::metrics::PerformanceSummary;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::position::{ExitReason, Position, Trade};
use crate::domain::signal::{SignalFrame, generate_signals};
use crate::domain::strategy::{StrategyParams, validate_exit_percentage};

/// Date window and risk-free rate for a backtest run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Annual rate, as a fraction.
    pub risk_free_rate: f64,
}

enum SimState {
    Flat,
    InPosition(Position),
}

pub fn simulate(
    series: &PriceSeries,
    signals: &[bool],
    exit_percentage: f64,
) -> Result<Vec<Trade>, MeanrevError> {
    if signals.len() != series.len() {
        return Err(MeanrevError::LengthMismatch {
            expected: series.len(),
            actual: signals.len(),
        });
    }
    validate_exit_percentage(exit_percentage)?;

    let bars = series.bars();
    let last = bars.len() - 1;
    let mut trades = Vec::new();
    let mut state = SimState::Flat;

    for (i, bar) in bars.iter().enumerate() {
        state = match state {
            // No entry on the final bar: there is no later bar to exit on.
            SimState::Flat if signals[i] && i < last => {
                debug!(date = %bar.date, price = bar.close, "open position");
                SimState::InPosition(Position::open(bar.date, bar.close))
            }
            SimState::Flat => SimState::Flat,
            SimState::InPosition(position) => {
                let reason = if position.hits_target(bar.close, exit_percentage) {
                    Some(ExitReason::TargetHit)
                } else if i == last {
                    Some(ExitReason::EndOfData)
                } else {
                    None
                };

                match reason {
                    Some(reason) => {
                        let trade = position.close(bar.date, bar.close, reason);
                        debug!(
                            date = %bar.date,
                            price = bar.close,
                            return_pct = trade.return_pct,
                            %reason,
                            "close position"
                        );
                        trades.push(trade);
                        SimState::Flat
                    }
                    None => SimState::InPosition(position),
                }
            }
        };
    }

    Ok(trades)
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub code: String,
    pub params: StrategyParams,
    pub signals: SignalFrame,
    pub trades: Vec<Trade>,
    pub summary: PerformanceSummary,
}

pub fn run_backtest(
    code: &str,
    series: &PriceSeries,
    params: &StrategyParams,
    risk_free_rate: f64,
) -> Result<BacktestResult, MeanrevError> {
    let signals = generate_signals(series, params)?;
    let trades = simulate(series, &signals.signals(), params.exit_percentage)?;
    let summary = PerformanceSummary::compute(&trades, risk_free_rate);

    debug!(
        code,
        first = %series.first_date(),
        bars = series.len(),
        signals = signals.signal_count(),
        trades = trades.len(),
        "backtest complete"
    );

    Ok(BacktestResult {
        code: code.to_string(),
        params: *params,
        signals,
        trades,
        summary,
    })
}
