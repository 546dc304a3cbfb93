//! Configuration validation.
//!
//! Each `read_*` function validates one concern and returns the typed value,
//! so the CLI never builds domain inputs from unchecked strings.

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::MeanrevError;
use crate::domain::live_signal::{DEFAULT_LOOKBACK_DAYS, MAX_LOOKBACK_DAYS};
use crate::domain::metrics::DEFAULT_RISK_FREE_RATE;
use crate::domain::strategy::StrategyParams;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_POOL_SIZE: u32 = 4;
/// r2d2 opens every connection up front, so the pool stays small.
pub const MAX_POOL_SIZE: u32 = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum DataSource {
    Csv { dir: PathBuf },
    Sqlite { path: String },
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), MeanrevError> {
    read_strategy_params(config)?;
    read_backtest_config(config)?;
    read_codes(config)?;
    read_data_source(config)?;
    read_lookback_days(config)?;
    read_pool_size(config)?;
    Ok(())
}

pub fn read_strategy_params(config: &dyn ConfigPort) -> Result<StrategyParams, MeanrevError> {
    let defaults = StrategyParams::default();

    let rsi_threshold = int_value(config, "strategy", "rsi_threshold", defaults.rsi_threshold as i64)?;
    if !(0..=100).contains(&rsi_threshold) {
        return Err(MeanrevError::config_invalid(
            "strategy",
            "rsi_threshold",
            "rsi_threshold must be between 0 and 100",
        ));
    }

    let exit_percentage =
        float_value(config, "strategy", "exit_percentage", defaults.exit_percentage)?;
    if exit_percentage <= 0.0 || exit_percentage >= 1.0 {
        return Err(MeanrevError::config_invalid(
            "strategy",
            "exit_percentage",
            "exit_percentage must be a fraction between 0 and 1 (0.05 means 5%)",
        ));
    }

    let red_days = int_value(config, "strategy", "red_days", defaults.red_days as i64)?;
    if red_days < 0 {
        return Err(MeanrevError::config_invalid(
            "strategy",
            "red_days",
            "red_days must be non-negative",
        ));
    }

    let rsi_period = int_value(config, "strategy", "rsi_period", defaults.rsi_period as i64)?;
    if rsi_period < 1 {
        return Err(MeanrevError::config_invalid(
            "strategy",
            "rsi_period",
            "rsi_period must be at least 1",
        ));
    }

    Ok(StrategyParams {
        rsi_threshold: rsi_threshold as u32,
        exit_percentage,
        red_days: red_days as usize,
        rsi_period: rsi_period as usize,
    })
}

pub fn read_strategy_name(config: &dyn ConfigPort) -> String {
    config
        .get_string("strategy", "name")
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| crate::domain::strategy::DEFAULT_STRATEGY_NAME.to_string())
}

pub fn read_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, MeanrevError> {
    let start_date = parse_date(config.get_string("backtest", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("backtest", "end_date").as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(MeanrevError::config_invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let risk_free_rate = float_value(config, "backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(MeanrevError::config_invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    Ok(BacktestConfig {
        start_date,
        end_date,
        risk_free_rate,
    })
}

/// Reads `codes` (comma separated) or falls back to a single `code`.
pub fn read_codes(config: &dyn ConfigPort) -> Result<Vec<String>, MeanrevError> {
    let (key, raw) = match (
        config.get_string("backtest", "codes"),
        config.get_string("backtest", "code"),
    ) {
        (Some(c), _) if !c.trim().is_empty() => ("codes", c),
        (_, Some(c)) if !c.trim().is_empty() => ("code", c),
        _ => return Err(MeanrevError::config_missing("backtest", "codes")),
    };

    parse_codes(&raw).map_err(|e| MeanrevError::config_invalid("backtest", key, e.to_string()))
}

pub fn read_data_source(config: &dyn ConfigPort) -> Result<DataSource, MeanrevError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());

    match source.trim().to_lowercase().as_str() {
        "csv" => match config.get_string("data", "csv_dir") {
            Some(dir) if !dir.trim().is_empty() => Ok(DataSource::Csv {
                dir: PathBuf::from(dir.trim()),
            }),
            _ => Err(MeanrevError::config_missing("data", "csv_dir")),
        },
        "sqlite" => match config.get_string("sqlite", "path") {
            Some(path) if !path.trim().is_empty() => Ok(DataSource::Sqlite {
                path: path.trim().to_string(),
            }),
            _ => Err(MeanrevError::config_missing("sqlite", "path")),
        },
        other => Err(MeanrevError::config_invalid(
            "data",
            "source",
            format!("unknown data source '{other}' (expected csv or sqlite)"),
        )),
    }
}

pub fn read_lookback_days(config: &dyn ConfigPort) -> Result<i64, MeanrevError> {
    let days = int_value(config, "signals", "lookback_days", DEFAULT_LOOKBACK_DAYS)?;
    if !(1..=MAX_LOOKBACK_DAYS).contains(&days) {
        return Err(MeanrevError::config_invalid(
            "signals",
            "lookback_days",
            format!("lookback_days must be between 1 and {MAX_LOOKBACK_DAYS}"),
        ));
    }
    Ok(days)
}

pub fn read_pool_size(config: &dyn ConfigPort) -> Result<u32, MeanrevError> {
    let size = int_value(config, "sqlite", "pool_size", i64::from(DEFAULT_POOL_SIZE))?;
    if !(1..=i64::from(MAX_POOL_SIZE)).contains(&size) {
        return Err(MeanrevError::config_invalid(
            "sqlite",
            "pool_size",
            format!("pool_size must be between 1 and {MAX_POOL_SIZE}"),
        ));
    }
    Ok(size as u32)
}

fn int_value(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, MeanrevError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => s.trim().parse().map_err(|_| {
            MeanrevError::config_invalid(section, key, format!("'{s}' is not an integer"))
        }),
    }
}

fn float_value(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, MeanrevError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(MeanrevError::config_invalid(
                section,
                key,
                format!("'{s}' is not a number"),
            )),
        },
    }
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, MeanrevError> {
    match value {
        None => Err(MeanrevError::config_missing("backtest", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            MeanrevError::config_invalid(
                "backtest",
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}
