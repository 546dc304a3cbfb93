//! RSI (Relative Strength Index).
//!
//! Average gain/loss is the simple mean over the trailing `period` close-to-close
//! changes, so the value at bar `i` depends on closes `i - period ..= i` only.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//! If avg_loss == 0: RSI = 100
//!
//! Warmup: the first `period` bars are undefined (bar `i` has only `i` changes behind it).

use crate::domain::error::MeanrevError;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::PriceSeries;

pub const DEFAULT_RSI_PERIOD: usize = 14;

pub fn compute_rsi(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>, MeanrevError> {
    if period == 0 {
        return Err(MeanrevError::InvalidParameter {
            name: "rsi_period",
            reason: "must be at least 1".into(),
        });
    }
    if let Some(&bad) = closes.iter().find(|c| !c.is_finite() || **c <= 0.0) {
        return Err(MeanrevError::InvalidParameter {
            name: "closes",
            reason: format!("close {bad} is not a positive finite price"),
        });
    }

    let mut gains = Vec::with_capacity(closes.len().saturating_sub(1));
    let mut losses = Vec::with_capacity(closes.len().saturating_sub(1));
    for w in closes.windows(2) {
        let change = w[1] - w[0];
        gains.push(change.max(0.0));
        losses.push((-change).max(0.0));
    }

    let mut values = vec![None; closes.len()];
    // Window sums are recomputed per bar rather than rolled, so a window without
    // down moves sums to exactly zero.
    for (i, value) in values.iter_mut().enumerate().skip(period) {
        let window = i - period..i;
        let avg_gain = gains[window.clone()].iter().sum::<f64>() / period as f64;
        let avg_loss = losses[window].iter().sum::<f64>() / period as f64;
        let rsi = if avg_loss == 0.0 {
            100.0
        } else {
            100.0 - (100.0 / (1.0 + avg_gain / avg_loss))
        };
        *value = Some(rsi);
    }

    Ok(values)
}

pub fn calculate_rsi(series: &PriceSeries, period: usize) -> Result<IndicatorSeries, MeanrevError> {
    let raw = compute_rsi(&series.closes(), period)?;
    let values = series
        .bars()
        .iter()
        .zip(raw)
        .map(|(bar, value)| IndicatorPoint {
            date: bar.date,
            value,
        })
        .collect();

    Ok(IndicatorSeries { period, values })
}
