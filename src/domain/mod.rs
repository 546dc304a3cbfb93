//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod pattern;
pub mod signal;
pub mod strategy;
pub mod position;
pub mod backtest;
pub mod metrics;
pub mod universe;
pub mod live_signal;
pub mod history;
pub mod config_validation;
pub mod error;
