//! Open positions and closed trades.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
}

impl Position {
    pub fn open(entry_date: NaiveDate, entry_price: f64) -> Self {
        Self {
            entry_date,
            entry_price,
        }
    }

    /// Signed move from entry as a fraction (0.05 = +5%).
    pub fn return_fraction(&self, price: f64) -> f64 {
        (price - self.entry_price) / self.entry_price
    }

    /// Bracket exit: a gain or a loss of at least `exit_percentage`.
    pub fn hits_target(&self, price: f64, exit_percentage: f64) -> bool {
        self.return_fraction(price).abs() >= exit_percentage
    }

    pub fn close(self, exit_date: NaiveDate, exit_price: f64, exit_reason: ExitReason) -> Trade {
        Trade {
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_date,
            exit_price,
            return_pct: self.return_fraction(exit_price) * 100.0,
            holding_days: (exit_date - self.entry_date).num_days(),
            exit_reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TargetHit,
    EndOfData,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::TargetHit => "target_hit",
            ExitReason::EndOfData => "end_of_data",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExitReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "target_hit" => Ok(ExitReason::TargetHit),
            "end_of_data" => Ok(ExitReason::EndOfData),
            other => Err(format!("unknown exit reason: {other}")),
        }
    }
}

/// A closed round trip. `return_pct` is in percent, `holding_days` in calendar days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub return_pct: f64,
    pub holding_days: i64,
    pub exit_reason: ExitReason,
}
