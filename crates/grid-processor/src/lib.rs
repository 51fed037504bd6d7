//! Aggregation and comparison of gridded climate fields.
//!
//! Two stages share the operations in this crate:
//!
//! ```text
//! raw files per source                          monthly climatologies + land-sea mask
//!      │                                                      │
//!      ▼                                                      ▼
//! load_timeseries ─► normalize                     normalize / align_mask_to_field
//!      │                                                      │
//!      ▼                                                      ▼
//! common_time_window ─► restrict_to_window        convert_units ─► apply_land_mask
//!      │                                                      │
//!      ▼                                                      ▼
//! monthly_climatology                     difference ─► derive_coastal_mask ─► select
//!      │                                                      │
//!      ▼                                                      ▼
//! persist  <name>_mavg.nc  ─────────────────►  area_weighted_mean / histogram ─► BiasReport
//! ```
//!
//! [`pipeline::aggregate`] and [`pipeline::compare`] run the stages from a
//! YAML configuration; every operation is also usable on its own.
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{pipeline, ComparatorConfig};
//!
//! let config = ComparatorConfig::from_file(Path::new("compare.yaml"))?;
//! let comparison = pipeline::compare(&config)?;
//! println!("{:?}", comparison.report.overall);
//! ```

pub mod climatology;
pub mod config;
pub mod histogram;
pub mod mask;
pub mod normalize;
pub mod pipeline;
pub mod report;
pub mod stats;
pub mod units;

// Re-export commonly used types at crate root
pub use climatology::{common_time_window, monthly_climatology, restrict_to_window, time_range};
pub use config::{
    load_yaml_config, AggregatorConfig, BinSpec, ClimatologyInput, ComparatorConfig, HistogramConfig,
    MaskInput, DEFAULT_HOT_THRESHOLD,
};
pub use histogram::{histogram, histogram_values, linspace, FrequencyTable};
pub use mask::{
    align_mask_to_field, apply_land_mask, coastal_selection, derive_coastal_mask, select,
    CoastalBoundary, MaskAlignment,
};
pub use normalize::{canonical_longitude, normalize, normalize_longitude, rename_coordinates, sort_ascending};
pub use report::{BiasReport, CellCounts, Histograms, MonthlyBias, RegionMeans};
pub use stats::{
    area_weighted_mean, area_weighted_mean_all, difference, reduce_leading, spatial_mean_series, Dim,
    Reduction, DIFFERENCE_VARIABLE,
};
pub use units::{convert_units, UnitTransform, KELVIN_OFFSET};
