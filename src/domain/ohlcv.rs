//! Daily OHLC bars and validated price series.

use chrono::NaiveDate;

use crate::domain::error::MeanrevError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl PriceBar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    fn validate(&self) -> Result<(), MeanrevError> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ];
        for (field, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                return Err(MeanrevError::InvalidPrice {
                    date: self.date,
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// A non-empty run of daily bars with strictly increasing dates and
/// positive, finite prices. Construction is the only way in, so every
/// downstream computation can rely on those invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(bars: Vec<PriceBar>) -> Result<Self, MeanrevError> {
        if bars.is_empty() {
            return Err(MeanrevError::EmptySeries);
        }

        for (index, bar) in bars.iter().enumerate() {
            bar.validate()?;
            if index > 0 && bar.date <= bars[index - 1].date {
                return Err(MeanrevError::NonIncreasingDate {
                    index,
                    previous: bars[index - 1].date,
                    current: bar.date,
                });
            }
        }

        Ok(Self { bars })
    }

    /// Builds a series from `(date, close)` pairs, using the close for all four prices.
    pub fn from_closes(points: &[(NaiveDate, f64)]) -> Result<Self, MeanrevError> {
        let bars = points
            .iter()
            .map(|&(date, close)| PriceBar::new(date, close, close, close, close))
            .collect();
        Self::new(bars)
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false for a constructed series.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.bars[0].date
    }

    pub fn last(&self) -> &PriceBar {
        &self.bars[self.bars.len() - 1]
    }
}
