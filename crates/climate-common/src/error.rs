//! Error types for the climate bias pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias using ClimateError.
pub type Result<T> = std::result::Result<T, ClimateError>;

/// Primary error type for aggregation and comparison.
///
/// Every variant aborts the running stage; nothing is retried.
#[derive(Debug, Error)]
pub enum ClimateError {
    // === Input Errors ===
    #[error("failed to load data from {path}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    // === Alignment Errors ===
    #[error("time ranges do not overlap: window start {start} is after window end {end}")]
    EmptyWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    // === Field Errors ===
    #[error("unit conversion failed: {0}")]
    UnitConversion(String),

    #[error("variable not found: {0}")]
    MissingVariable(String),

    #[error("invalid field: {0}")]
    InvalidField(String),

    // === Output / Setup Errors ===
    #[error("failed to write {path}: {reason}")]
    Persist { path: PathBuf, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ClimateError {
    /// Create a DataLoad error.
    pub fn data_load(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DataLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a GridMismatch error.
    pub fn grid_mismatch(msg: impl Into<String>) -> Self {
        Self::GridMismatch(msg.into())
    }

    /// Create an InvalidField error.
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    /// Create a Persist error.
    pub fn persist(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Persist {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_data_load_message_names_file() {
        let err = ClimateError::data_load("/data/era5/t2m_2001.nc", "no such file");
        let msg = err.to_string();
        assert!(msg.contains("/data/era5/t2m_2001.nc"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_empty_window_message() {
        let err = ClimateError::EmptyWindow {
            start: Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2001, 12, 1, 0, 0, 0).unwrap(),
        };
        assert!(err.to_string().contains("do not overlap"));
    }
}
