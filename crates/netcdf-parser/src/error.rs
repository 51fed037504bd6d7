//! Error types for NetCDF operations.

use std::path::{Path, PathBuf};

use climate_common::ClimateError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF reading and writing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by the netCDF library
    #[error("netCDF error: {0}")]
    Library(#[from] netcdf::Error),

    /// Missing required variable, dimension or attribute
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// No file in the directory matched the pattern
    #[error("no files matching '{pattern}' in {}", directory.display())]
    NoFiles { directory: PathBuf, pattern: String },

    /// Files of one source disagree on their grid
    #[error("incompatible grid: {0}")]
    IncompatibleGrid(String),

    /// Time units or values could not be decoded
    #[error("time axis: {0}")]
    TimeUnits(#[from] climate_common::time::TimeParseError),

    /// Field invariant violated while assembling the result
    #[error(transparent)]
    Field(#[from] ClimateError),
}

impl NetCdfError {
    /// Convert to a DataLoad error naming the file being read.
    ///
    /// Field errors that already carry their own kind pass through.
    pub fn into_load_error(self, path: &Path) -> ClimateError {
        match self {
            NetCdfError::Field(err) => err,
            other => ClimateError::data_load(path, other.to_string()),
        }
    }

    /// Convert to a Persist error naming the destination.
    pub fn into_persist_error(self, path: &Path) -> ClimateError {
        match self {
            NetCdfError::Field(err) => err,
            other => ClimateError::persist(path, other.to_string()),
        }
    }
}
