//! Common types shared across the climate bias workspace.
//!
//! Everything the Aggregator and Comparator pass between each other lives
//! here: gridded fields and their coordinate axes, the land/sea and derived
//! masks, CF time handling, source specifications, and the error type every
//! stage reports through.

pub mod error;
pub mod field;
pub mod grid;
pub mod mask;
pub mod source;
pub mod time;

pub use error::{ClimateError, Result};
pub use field::{AxisNames, GriddedField, LeadingAxis, Variable, MONTH_AXIS};
pub use grid::{LongitudeDomain, SpatialGrid, DEFAULT_GRID_TOLERANCE};
pub use mask::{CoastalMask, LandSeaMask, SelectionMask};
pub use source::{CoordinateConvention, SourceSpec};
pub use time::{CfTimeUnits, TimeRange, TimeUnit};
