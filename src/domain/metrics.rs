//! Performance metrics over a list of closed trades.
//!
//! Every figure is a pure function of the trades in chronological order.
//! Returns are in percent, matching `Trade::return_pct`; `win_rate` is a fraction.

use serde::Serialize;

use crate::domain::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const ZERO_VARIANCE: f64 = 1e-12;

pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub total_return: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    /// Best winning trade, 0 when there are no wins.
    pub largest_win: f64,
    /// Worst losing trade, 0 when there are no losses.
    pub largest_loss: f64,
    pub median_return: f64,
    pub std_return: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub avg_holding_days: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
}

impl PerformanceSummary {
    pub fn compute(trades: &[Trade], risk_free_rate: f64) -> Self {
        let returns: Vec<f64> = trades.iter().map(|t| t.return_pct).collect();
        if returns.is_empty() {
            return Self::empty();
        }

        let n = returns.len() as f64;
        let total_return: f64 = returns.iter().sum();
        let avg_return = total_return / n;

        let wins: Vec<f64> = returns.iter().copied().filter(|&r| r > 0.0).collect();
        let losses: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let total_wins: f64 = wins.iter().sum();
        let total_losses: f64 = losses.iter().sum();

        let profit_factor = if total_losses < 0.0 {
            (total_wins / total_losses).abs()
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let holding_days: i64 = trades.iter().map(|t| t.holding_days).sum();

        Self {
            total_trades: returns.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: wins.len() as f64 / n,
            avg_return,
            total_return,
            best_trade: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            worst_trade: returns.iter().copied().fold(f64::INFINITY, f64::min),
            largest_win: wins.iter().copied().fold(0.0, f64::max),
            largest_loss: losses.iter().copied().fold(0.0, f64::min),
            median_return: median(&returns),
            std_return: population_stddev(&returns),
            avg_win: mean_or_zero(&wins),
            avg_loss: mean_or_zero(&losses),
            profit_factor,
            avg_holding_days: holding_days as f64 / n,
            max_drawdown: compute_max_drawdown(&returns),
            sharpe_ratio: compute_sharpe_ratio(&returns, risk_free_rate),
        }
    }

    fn empty() -> Self {
        Self {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            avg_return: 0.0,
            total_return: 0.0,
            best_trade: 0.0,
            worst_trade: 0.0,
            largest_win: 0.0,
            largest_loss: 0.0,
            median_return: 0.0,
            std_return: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit_factor: 0.0,
            avg_holding_days: 0.0,
            max_drawdown: 0.0,
            sharpe_ratio: 0.0,
        }
    }
}

/// Largest peak-to-trough decline of the compounded trade curve, in percent.
pub fn compute_max_drawdown(returns_pct: &[f64]) -> f64 {
    if returns_pct.len() < 2 {
        return 0.0;
    }

    let mut cumulative = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for r in returns_pct {
        cumulative *= 1.0 + r / 100.0;
        peak = peak.max(cumulative);
        if peak > 0.0 {
            worst = worst.min((cumulative - peak) / peak);
        }
    }

    worst.abs() * 100.0
}

/// Annualized per-trade Sharpe ratio; needs at least two trades.
pub fn compute_sharpe_ratio(returns_pct: &[f64], risk_free_rate: f64) -> f64 {
    if returns_pct.len() < 2 {
        return 0.0;
    }

    let per_trade_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;
    let excess: Vec<f64> = returns_pct
        .iter()
        .map(|r| r / 100.0 - per_trade_rf)
        .collect();

    let stddev = population_stddev(&excess);
    if stddev <= ZERO_VARIANCE {
        return 0.0;
    }

    mean_or_zero(&excess) / stddev * TRADING_DAYS_PER_YEAR.sqrt()
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn population_stddev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean_or_zero(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
