//! NetCDF I/O for gridded climate fields.
//!
//! This crate reads the raw multi-file reanalysis/observation dumps and the
//! monthly climatologies derived from them, and writes climatologies back
//! out.
//!
//! # Reading
//!
//! Variables are expected as `(leading, lat, lon)` or `(lat, lon)`, where
//! the leading axis is either CF-encoded time (`"hours since ..."`,
//! `"days since ..."`) or a month-of-year axis. Packed variables
//! (`scale_factor`/`add_offset`) are unpacked and `_FillValue` /
//! `missing_value` cells become NaN.
//!
//! # Writing
//!
//! [`persist`] writes a hidden sibling file and renames it into place, so a
//! failed run never leaves a truncated output behind. [`OutputSet`] does the
//! same for several files that must appear together or not at all.
//!
//! # System requirements
//!
//! Links against libnetcdf and libhdf5 (`libhdf5-dev libnetcdf-dev`).

pub mod error;
pub mod locator;
pub mod native;
pub mod reader;
pub mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use locator::{locate_files, wildcard_match};
pub use native::silence_hdf5_errors;
pub use reader::{load_climatology, load_field, load_timeseries, read_field};
pub use writer::{persist, OutputSet, FILL_VALUE_F32};
