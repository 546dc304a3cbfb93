//! Entry signal generation.
//!
//! A signal row keeps the inputs it was derived from (close, RSI, red-day run),
//! so the frame doubles as the chart overlay for the price series.

use chrono::NaiveDate;

use crate::domain::error::MeanrevError;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::pattern::compute_red_run;
use crate::domain::strategy::StrategyParams;

/// True iff RSI is defined, strictly below `rsi_threshold`, and the red-day run
/// has reached `red_days_threshold`.
pub fn generate_signal(
    red_run: usize,
    rsi: Option<f64>,
    red_days_threshold: usize,
    rsi_threshold: u32,
) -> bool {
    match rsi {
        Some(value) => value < f64::from(rsi_threshold) && red_run >= red_days_threshold,
        None => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalRow {
    pub date: NaiveDate,
    pub close: f64,
    pub rsi: Option<f64>,
    pub red_run: usize,
    pub buy_signal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalFrame {
    pub rsi_period: usize,
    pub rows: Vec<SignalRow>,
}

impl SignalFrame {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn signals(&self) -> Vec<bool> {
        self.rows.iter().map(|r| r.buy_signal).collect()
    }

    pub fn signal_count(&self) -> usize {
        self.rows.iter().filter(|r| r.buy_signal).count()
    }

    pub fn rsi_series(&self) -> IndicatorSeries {
        IndicatorSeries {
            period: self.rsi_period,
            values: self
                .rows
                .iter()
                .map(|r| IndicatorPoint {
                    date: r.date,
                    value: r.rsi,
                })
                .collect(),
        }
    }

    pub fn last(&self) -> Option<&SignalRow> {
        self.rows.last()
    }
}

pub fn generate_signals(
    series: &PriceSeries,
    params: &StrategyParams,
) -> Result<SignalFrame, MeanrevError> {
    params.validate()?;

    let rsi = calculate_rsi(series, params.rsi_period)?;
    let red_run = compute_red_run(&series.closes());

    let rows = series
        .bars()
        .iter()
        .zip(rsi.values)
        .zip(red_run)
        .map(|((bar, point), red_run)| SignalRow {
            date: bar.date,
            close: bar.close,
            rsi: point.value,
            red_run,
            buy_signal: generate_signal(red_run, point.value, params.red_days, params.rsi_threshold),
        })
        .collect();

    Ok(SignalFrame {
        rsi_period: params.rsi_period,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let points: Vec<_> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| (start + chrono::Duration::days(i as i64), c))
            .collect();
        PriceSeries::from_closes(&points).unwrap()
    }

    #[test]
    fn undefined_rsi_never_signals() {
        assert!(!generate_signal(10, None, 1, 100));
    }

    #[test]
    fn threshold_is_strict() {
        assert!(!generate_signal(3, Some(30.0), 2, 30));
        assert!(generate_signal(3, Some(29.99), 2, 30));
    }

    #[test]
    fn run_threshold_is_inclusive() {
        assert!(generate_signal(2, Some(10.0), 2, 30));
        assert!(!generate_signal(1, Some(10.0), 2, 30));
    }

    #[test]
    fn frame_matches_declining_scenario() {
        let params = StrategyParams {
            rsi_threshold: 50,
            exit_percentage: 0.05,
            red_days: 3,
            rsi_period: 4,
        };
        let frame =
            generate_signals(&series_from(&[100.0, 98.0, 96.0, 94.0, 92.0, 95.0]), &params)
                .unwrap();

        assert_eq!(frame.len(), 6);
        assert_eq!(frame.signals(), vec![false, false, false, false, true, false]);
        assert_eq!(frame.rows[4].red_run, 4);
        assert_eq!(frame.rows[4].rsi, Some(0.0));
        assert_eq!(frame.signal_count(), 1);
    }

    #[test]
    fn frame_exposes_rsi_series() {
        let params = StrategyParams {
            rsi_period: 2,
            ..StrategyParams::default()
        };
        let series = series_from(&[10.0, 11.0, 12.0]);
        let frame = generate_signals(&series, &params).unwrap();
        let rsi = frame.rsi_series();
        assert_eq!(rsi.period, 2);
        assert_eq!(rsi.value_at(2), Some(100.0));
        assert_eq!(rsi.value_at(1), None);
        assert_eq!(rsi, calculate_rsi(&series, 2).unwrap());
    }

    #[test]
    fn invalid_params_rejected() {
        let params = StrategyParams {
            exit_percentage: 0.0,
            ..StrategyParams::default()
        };
        assert!(generate_signals(&series_from(&[10.0, 11.0]), &params).is_err());
    }
}
