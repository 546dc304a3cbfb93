#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use meanrev::domain::error::MeanrevError;
use meanrev::domain::live_signal::LiveSignal;
pub use meanrev::domain::ohlcv::{PriceBar, PriceSeries};
use meanrev::domain::strategy::StrategyParams;
use meanrev::ports::data_port::DataPort;
use meanrev::ports::notify_port::NotifyPort;
use std::cell::RefCell;
use std::collections::HashMap;

/// Serves bars from memory, honouring the requested date window.
pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, MeanrevError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(MeanrevError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Records every alert; optionally fails for chosen codes.
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<LiveSignal>>,
    pub fail_for: Vec<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            fail_for: Vec::new(),
        }
    }

    pub fn failing_for(code: &str) -> Self {
        Self {
            sent: RefCell::new(Vec::new()),
            fail_for: vec![code.to_string()],
        }
    }
}

impl NotifyPort for RecordingNotifier {
    fn notify(&self, signal: &LiveSignal) -> Result<(), MeanrevError> {
        if self.fail_for.contains(&signal.code) {
            return Err(MeanrevError::Notification {
                reason: "gateway unavailable".into(),
            });
        }
        self.sent.borrow_mut().push(signal.clone());
        Ok(())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn start_date() -> NaiveDate {
    date("2024-01-01")
}

/// Consecutive calendar-day bars starting at `start`, flat OHLC at each close.
pub fn bars_from(start: NaiveDate, closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::new(start + Duration::days(i as i64), c, c, c, c))
        .collect()
}

pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    bars_from(start_date(), closes)
}

pub fn make_series(closes: &[f64]) -> PriceSeries {
    PriceSeries::new(make_bars(closes)).unwrap()
}

/// Four straight down days then a bounce; trades once with `short_params`.
pub const DIP_AND_BOUNCE: [f64; 6] = [100.0, 98.0, 96.0, 94.0, 92.0, 95.0];

pub fn short_params() -> StrategyParams {
    StrategyParams {
        rsi_threshold: 50,
        exit_percentage: 0.05,
        red_days: 3,
        rsi_period: 4,
    }
}

/// A saw-tooth walk: runs of falling closes followed by sharp rebounds.
pub fn sawtooth(len: usize) -> Vec<f64> {
    let mut closes = Vec::with_capacity(len);
    let mut price = 100.0;
    for i in 0..len {
        if i % 7 < 5 {
            price *= 0.985;
        } else {
            price *= 1.06;
        }
        closes.push(price);
    }
    closes
}
