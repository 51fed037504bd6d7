//! The comparator's JSON summary.

use std::path::Path;

use chrono::{DateTime, Utc};
use climate_common::{ClimateError, Result};
use serde::{Deserialize, Serialize};

use crate::histogram::FrequencyTable;

/// Area-weighted mean difference of one selection.
///
/// `None` means the selection held no defined cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionMeans {
    pub all: Option<f64>,
    pub coastal: Option<f64>,
    pub inland: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBias {
    pub month: u32,
    #[serde(flatten)]
    pub means: RegionMeans,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellCounts {
    pub total: usize,
    pub land: usize,
    pub coastal: usize,
    pub inland: usize,
    /// Coastal cells whose difference is below the hot threshold in at
    /// least one month.
    pub hot_coastal: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histograms {
    pub all: FrequencyTable,
    pub coastal: FrequencyTable,
    pub inland: FrequencyTable,
}

/// Everything a renderer needs to draw the bias diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasReport {
    pub generated_at: DateTime<Utc>,
    pub field_a: String,
    pub field_b: String,
    pub units: Option<String>,
    pub hot_threshold: f32,
    pub cells: CellCounts,
    pub overall: RegionMeans,
    pub monthly: Vec<MonthlyBias>,
    pub histograms: Histograms,
}

impl BiasReport {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ClimateError::invalid_field(format!("report serialization: {}", e)))
    }

    /// Write the report as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| ClimateError::persist(path, e.to_string()))
    }
}
