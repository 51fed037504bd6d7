//! Configuration for the aggregation and comparison pipelines.
//!
//! Both configs are YAML documents. `${VAR}` and `${VAR:-default}` are
//! replaced from the environment before parsing, so data roots can differ
//! between machines without editing the file.

use std::path::{Path, PathBuf};

use climate_common::{ClimateError, CoordinateConvention, Result, SourceSpec, TimeRange, DEFAULT_GRID_TOLERANCE};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::histogram::linspace;
use crate::mask::{CoastalBoundary, MaskAlignment};
use crate::units::UnitTransform;

/// Default probe for strongly negative (hot-cell) differences, in degrees.
pub const DEFAULT_HOT_THRESHOLD: f32 = -2.0;

/// Aggregator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Sources to aggregate; all are restricted to their common window.
    pub sources: Vec<SourceSpec>,

    /// Directory receiving one `<name>_mavg.nc` per source.
    pub output_dir: PathBuf,

    /// Optional window, intersected with the sources' common window.
    #[serde(default)]
    pub time_window: Option<TimeRange>,
}

impl AggregatorConfig {
    /// Load and validate a YAML config.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = load_yaml_config(path)?;
        config.validate().map_err(ClimateError::Config)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.sources.is_empty() {
            return Err("at least one source is required".to_string());
        }
        for source in &self.sources {
            source.validate()?;
        }
        for (i, a) in self.sources.iter().enumerate() {
            if self.sources[i + 1..].iter().any(|b| b.name == a.name) {
                return Err(format!("source name '{}' is used twice", a.name));
            }
        }
        if let Some(window) = &self.time_window {
            if window.start > window.end {
                return Err(format!(
                    "time_window starts ({}) after it ends ({})",
                    window.start, window.end
                ));
            }
        }
        Ok(())
    }

    /// Output path for a source's climatology.
    pub fn output_path(&self, source: &SourceSpec) -> PathBuf {
        self.output_dir.join(format!("{}_mavg.nc", source.name))
    }
}

/// A monthly climatology written by the aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClimatologyInput {
    /// Label used in logs and the report.
    pub name: String,
    pub path: PathBuf,
    pub variable: String,
    /// Applied after loading, before the difference is taken.
    #[serde(default)]
    pub unit_transform: Option<UnitTransform>,
}

/// The static land-sea mask file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskInput {
    pub path: PathBuf,

    #[serde(default = "default_mask_variable")]
    pub variable: String,

    /// Axis names in the mask file; ERA5 names by default.
    #[serde(default = "CoordinateConvention::era5")]
    pub convention: CoordinateConvention,

    /// A cell is land when its fraction exceeds this value.
    #[serde(default)]
    pub land_threshold: f32,
}

fn default_mask_variable() -> String {
    "lsm".to_string()
}

impl MaskInput {
    /// Mask reading options for a given grid tolerance.
    pub fn alignment(&self, tolerance: f64) -> MaskAlignment {
        MaskAlignment {
            variable: self.variable.clone(),
            convention: self.convention.clone(),
            land_threshold: self.land_threshold,
            tolerance,
        }
    }
}

/// Evenly spaced bin edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    pub start: f64,
    pub stop: f64,
    /// Number of edges (bins + 1).
    pub edges: usize,
}

impl BinSpec {
    pub fn edges(&self) -> Vec<f64> {
        linspace(self.start, self.stop, self.edges)
    }

    fn validate(&self, name: &str) -> std::result::Result<(), String> {
        if self.edges < 2 {
            return Err(format!("histogram.{} needs at least 2 edges", name));
        }
        if !(self.start < self.stop) {
            return Err(format!("histogram.{} start must be below stop", name));
        }
        Ok(())
    }
}

/// Histogram settings for the report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    /// Bins for the histogram of all land cells (raw counts).
    #[serde(default = "HistogramConfig::default_overall")]
    pub overall: BinSpec,

    /// Bins shared by the coastal and inland histograms.
    #[serde(default = "HistogramConfig::default_partition")]
    pub partition: BinSpec,

    /// Report the coastal/inland histograms as densities.
    #[serde(default = "default_true")]
    pub density: bool,
}

fn default_true() -> bool {
    true
}

impl HistogramConfig {
    fn default_overall() -> BinSpec {
        BinSpec {
            start: -15.0,
            stop: 15.0,
            edges: 30,
        }
    }

    fn default_partition() -> BinSpec {
        BinSpec {
            start: -10.0,
            stop: 10.0,
            edges: 40,
        }
    }
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            overall: Self::default_overall(),
            partition: Self::default_partition(),
            density: true,
        }
    }
}

/// Comparator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparatorConfig {
    /// Minuend of the difference (ERA5 in the reference setup).
    pub field_a: ClimatologyInput,

    /// Subtrahend of the difference (CRU-TS in the reference setup).
    pub field_b: ClimatologyInput,

    pub land_sea_mask: MaskInput,

    /// Cells with `a - b` below this are "hot".
    #[serde(default = "default_hot_threshold")]
    pub hot_threshold: f32,

    #[serde(default)]
    pub histogram: HistogramConfig,

    #[serde(default)]
    pub coastal_boundary: CoastalBoundary,

    /// Absolute tolerance (degrees) when matching coordinates.
    #[serde(default = "default_grid_tolerance")]
    pub grid_tolerance: f64,

    /// Where to write the JSON report, if anywhere.
    #[serde(default)]
    pub report_path: Option<PathBuf>,

    /// Where to write the difference fields as netCDF, if anywhere.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

fn default_hot_threshold() -> f32 {
    DEFAULT_HOT_THRESHOLD
}

fn default_grid_tolerance() -> f64 {
    DEFAULT_GRID_TOLERANCE
}

impl ComparatorConfig {
    /// Load and validate a YAML config.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = load_yaml_config(path)?;
        config.validate().map_err(ClimateError::Config)?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> std::result::Result<(), String> {
        for (label, input) in [("field_a", &self.field_a), ("field_b", &self.field_b)] {
            if input.variable.trim().is_empty() {
                return Err(format!("{}.variable must not be empty", label));
            }
        }
        if self.land_sea_mask.variable.trim().is_empty() {
            return Err("land_sea_mask.variable must not be empty".to_string());
        }
        if !self.hot_threshold.is_finite() {
            return Err("hot_threshold must be finite".to_string());
        }
        if !(self.grid_tolerance >= 0.0) {
            return Err("grid_tolerance must be >= 0".to_string());
        }
        self.histogram.overall.validate("overall")?;
        self.histogram.partition.validate("partition")?;
        Ok(())
    }
}

/// Read a YAML file, expand environment variables, and deserialize it.
pub fn load_yaml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ClimateError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    parse_yaml_config(&content)
        .map_err(|e| ClimateError::Config(format!("{}: {}", path.display(), e)))
}

/// Expand environment variables in `content` and deserialize it.
pub fn parse_yaml_config<T: DeserializeOwned>(content: &str) -> std::result::Result<T, String> {
    let expanded = expand_env_vars(content)?;
    serde_yaml::from_str(&expanded).map_err(|e| e.to_string())
}

/// Expand `${VAR}` and `${VAR:-default}` references.
fn expand_env_vars(content: &str) -> std::result::Result<String, String> {
    let mut result = String::with_capacity(content.len());
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut brace_count = 1;

            while brace_count > 0 {
                match chars.next() {
                    Some('{') => {
                        brace_count += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        brace_count -= 1;
                        if brace_count > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => return Err(format!("unclosed variable substitution: ${{{}", var_expr)),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(result)
}

/// Resolve `VAR` or `VAR:-default`.
fn resolve_var_expr(expr: &str) -> std::result::Result<String, String> {
    if let Some((var_name, default)) = expr.split_once(":-") {
        match std::env::var(var_name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        std::env::var(expr.trim()).map_err(|_| format!("environment variable {} not set", expr))
    }
}
