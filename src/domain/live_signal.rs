//! Latest-bar signal scan and alert formatting.

use chrono::{Duration, NaiveDate};
use std::fmt::Write as _;
use tracing::{info, warn};

use crate::domain::error::MeanrevError;
use crate::domain::ohlcv::PriceSeries;
use crate::domain::signal::generate_signals;
use crate::domain::strategy::StrategyParams;
use crate::ports::data_port::DataPort;
use crate::ports::notify_port::NotifyPort;

pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;
/// Upper bound accepted from configuration (about a century of history).
pub const MAX_LOOKBACK_DAYS: i64 = 36_500;

#[derive(Debug, Clone, PartialEq)]
pub struct LiveSignal {
    pub code: String,
    pub date: NaiveDate,
    pub price: f64,
    pub rsi: f64,
    pub red_days: usize,
    pub params: StrategyParams,
}

impl LiveSignal {
    pub fn subject(&self) -> String {
        format!("Trading Signal: {} BUY Alert", self.code)
    }

    pub fn alert_message(&self) -> String {
        let mut msg = String::new();
        let _ = writeln!(msg, "TRADING SIGNAL ALERT");
        let _ = writeln!(msg);
        let _ = writeln!(msg, "Ticker: {}", self.code);
        let _ = writeln!(msg, "Signal: BUY");
        let _ = writeln!(msg, "Date: {}", self.date);
        let _ = writeln!(msg, "Price: ${:.2}", self.price);
        let _ = writeln!(msg, "RSI: {:.1}", self.rsi);
        let _ = writeln!(msg, "Consecutive Red Days: {}", self.red_days);
        let _ = writeln!(msg);
        let _ = writeln!(msg, "Strategy Parameters:");
        let _ = writeln!(msg, "- RSI Threshold: {}", self.params.rsi_threshold);
        let _ = writeln!(msg, "- Red Days Required: {}", self.params.red_days);
        let _ = write!(
            msg,
            "- Exit Percentage: {:.1}%",
            self.params.exit_percentage * 100.0
        );
        msg
    }
}

/// Reports a BUY when the final bar of `series` carries an entry signal.
pub fn scan_latest(
    code: &str,
    series: &PriceSeries,
    params: &StrategyParams,
) -> Result<Option<LiveSignal>, MeanrevError> {
    let frame = generate_signals(series, params)?;
    let signal = frame.last().and_then(|row| match (row.buy_signal, row.rsi) {
        (true, Some(rsi)) => Some(LiveSignal {
            code: code.to_string(),
            date: row.date,
            price: row.close,
            rsi,
            red_days: row.red_run,
            params: *params,
        }),
        _ => None,
    });
    Ok(signal)
}

/// Scans each code's recent history and notifies on every BUY found.
///
/// Codes without usable data are skipped, and a failed notification does not
/// stop the scan; both are logged.
pub fn check_live_signals(
    data_port: &dyn DataPort,
    notifier: &dyn NotifyPort,
    codes: &[String],
    params: &StrategyParams,
    as_of: NaiveDate,
    lookback_days: i64,
) -> Result<Vec<LiveSignal>, MeanrevError> {
    params.validate()?;
    if lookback_days < 1 {
        return Err(MeanrevError::InvalidParameter {
            name: "lookback_days",
            reason: "must be at least 1".into(),
        });
    }

    let start = Duration::try_days(lookback_days)
        .and_then(|span| as_of.checked_sub_signed(span))
        .ok_or_else(|| MeanrevError::InvalidParameter {
            name: "lookback_days",
            reason: format!("{lookback_days} days before {as_of} is out of range"),
        })?;
    let mut found = Vec::new();

    for code in codes {
        let bars = match data_port.fetch_bars(code, start, as_of) {
            Ok(bars) if !bars.is_empty() => bars,
            Ok(_) => {
                warn!(code = %code, "no recent data");
                continue;
            }
            Err(e) => {
                warn!(code = %code, error = %e, "failed to fetch recent data");
                continue;
            }
        };
        let series = match PriceSeries::new(bars) {
            Ok(s) => s,
            Err(e) => {
                warn!(code = %code, error = %e, "invalid recent data");
                continue;
            }
        };

        let Some(signal) = scan_latest(code, &series, params)? else {
            continue;
        };

        info!(code = %code, price = signal.price, rsi = signal.rsi, "buy signal");
        if let Err(e) = notifier.notify(&signal) {
            warn!(code = %code, error = %e, "notification failed");
        }
        found.push(signal);
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series_from(closes: &[f64]) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let points: Vec<_> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| (start + Duration::days(i as i64), c))
            .collect();
        PriceSeries::from_closes(&points).unwrap()
    }

    fn params() -> StrategyParams {
        StrategyParams {
            rsi_threshold: 50,
            exit_percentage: 0.05,
            red_days: 3,
            rsi_period: 4,
        }
    }

    #[test]
    fn latest_bar_signal_reported() {
        let series = series_from(&[100.0, 98.0, 96.0, 94.0, 92.0]);
        let signal = scan_latest("XYZ", &series, &params()).unwrap().unwrap();

        assert_eq!(signal.code, "XYZ");
        assert_eq!(signal.price, 92.0);
        assert_eq!(signal.red_days, 4);
        assert_eq!(signal.rsi, 0.0);
        assert_eq!(signal.date, series.last().date);
    }

    #[test]
    fn earlier_signal_is_not_live() {
        let series = series_from(&[100.0, 98.0, 96.0, 94.0, 92.0, 95.0]);
        assert!(scan_latest("XYZ", &series, &params()).unwrap().is_none());
    }

    #[test]
    fn alert_message_contents() {
        let series = series_from(&[100.0, 98.0, 96.0, 94.0, 92.0]);
        let signal = scan_latest("XYZ", &series, &params()).unwrap().unwrap();
        let msg = signal.alert_message();

        assert!(msg.contains("Ticker: XYZ"));
        assert!(msg.contains("Price: $92.00"));
        assert!(msg.contains("RSI: 0.0"));
        assert!(msg.contains("Consecutive Red Days: 4"));
        assert!(msg.contains("- RSI Threshold: 50"));
        assert!(msg.contains("- Exit Percentage: 5.0%"));
        assert_eq!(signal.subject(), "Trading Signal: XYZ BUY Alert");
    }
}
