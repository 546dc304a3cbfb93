//! Strategy parameters for the RSI-filtered red-day mean reversion rule.

use serde::Serialize;

use crate::domain::error::MeanrevError;
use crate::domain::indicator::rsi::DEFAULT_RSI_PERIOD;

pub const DEFAULT_STRATEGY_NAME: &str = "Mean Reversion";

/// Entry: at least `red_days` consecutive down closes with RSI below `rsi_threshold`.
/// Exit: close moves `exit_percentage` (a fraction, 0.05 = 5%) away from entry in
/// either direction, or the data ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StrategyParams {
    pub rsi_threshold: u32,
    pub exit_percentage: f64,
    pub red_days: usize,
    pub rsi_period: usize,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            rsi_threshold: 30,
            exit_percentage: 0.05,
            red_days: 2,
            rsi_period: DEFAULT_RSI_PERIOD,
        }
    }
}

impl StrategyParams {
    pub fn validate(&self) -> Result<(), MeanrevError> {
        if self.rsi_threshold > 100 {
            return Err(MeanrevError::InvalidParameter {
                name: "rsi_threshold",
                reason: format!("{} is outside 0..=100", self.rsi_threshold),
            });
        }
        validate_exit_percentage(self.exit_percentage)?;
        if self.rsi_period == 0 {
            return Err(MeanrevError::InvalidParameter {
                name: "rsi_period",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_exit_percentage(value: f64) -> Result<(), MeanrevError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(MeanrevError::InvalidParameter {
            name: "exit_percentage",
            reason: format!("{value} must be a positive fraction"),
        });
    }
    if value >= 1.0 {
        return Err(MeanrevError::InvalidParameter {
            name: "exit_percentage",
            reason: format!("{value} must be a fraction below 1 (0.05 means 5%)"),
        });
    }
    Ok(())
}
