//! Domain error types.

use chrono::NaiveDate;

use crate::domain::universe::UniverseError;

/// Top-level error type for meanrev.
#[derive(Debug, thiserror::Error)]
pub enum MeanrevError {
    #[error("price series is empty")]
    EmptySeries,

    #[error("invalid {field} price {value} on {date}: prices must be positive and finite")]
    InvalidPrice {
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("dates must be strictly increasing: bar {index} ({current}) follows {previous}")]
    NonIncreasingDate {
        index: usize,
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("notification error: {reason}")]
    Notification { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MeanrevError {
    pub(crate) fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MeanrevError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn config_missing(section: &str, key: &str) -> Self {
        MeanrevError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }

    /// True for the errors a caller caused by passing malformed series or parameters.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            MeanrevError::EmptySeries
                | MeanrevError::InvalidPrice { .. }
                | MeanrevError::NonIncreasingDate { .. }
                | MeanrevError::InvalidParameter { .. }
                | MeanrevError::LengthMismatch { .. }
        )
    }
}

impl From<&MeanrevError> for std::process::ExitCode {
    fn from(err: &MeanrevError) -> Self {
        let code: u8 = match err {
            MeanrevError::Io(_) | MeanrevError::Report { .. } => 1,
            MeanrevError::ConfigParse { .. }
            | MeanrevError::ConfigMissing { .. }
            | MeanrevError::ConfigInvalid { .. } => 2,
            MeanrevError::Database { .. } | MeanrevError::DatabaseQuery { .. } => 3,
            MeanrevError::EmptySeries
            | MeanrevError::InvalidPrice { .. }
            | MeanrevError::NonIncreasingDate { .. }
            | MeanrevError::InvalidParameter { .. }
            | MeanrevError::LengthMismatch { .. } => 4,
            MeanrevError::Data { .. } | MeanrevError::NoData { .. } | MeanrevError::Universe(_) => 5,
            MeanrevError::Notification { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
