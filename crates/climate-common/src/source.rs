//! Source dataset specifications.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::field::AxisNames;

/// Axis names used by a source's files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinateConvention {
    pub time: String,
    pub lat: String,
    pub lon: String,
}

impl Default for CoordinateConvention {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            lat: "lat".to_string(),
            lon: "lon".to_string(),
        }
    }
}

impl CoordinateConvention {
    /// ERA5 spells out the spatial axes.
    pub fn era5() -> Self {
        Self {
            lat: "latitude".to_string(),
            lon: "longitude".to_string(),
            ..Default::default()
        }
    }

    /// Mapping from this convention's names to the canonical ones.
    ///
    /// Only names that differ appear in the map.
    pub fn rename_map(&self) -> BTreeMap<String, String> {
        let canonical = AxisNames::canonical();
        [
            (&self.time, canonical.leading),
            (&self.lat, canonical.lat),
            (&self.lon, canonical.lon),
        ]
        .into_iter()
        .filter(|(from, to)| *from != to)
        .map(|(from, to)| (from.clone(), to))
        .collect()
    }
}

/// Where to find one dataset and what to read from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSpec {
    /// Short name used for logging and output file naming (e.g. "era5").
    pub name: String,
    /// Directory holding the files.
    pub directory: PathBuf,
    /// File name pattern; `*` and `?` wildcards.
    pub pattern: String,
    /// Variables to load (e.g. ["t2m"]).
    pub variables: Vec<String>,
    #[serde(default)]
    pub convention: CoordinateConvention,
}

impl SourceSpec {
    /// Validate the specification.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("source name must not be empty".to_string());
        }
        if self.pattern.trim().is_empty() {
            return Err(format!("source '{}' has an empty file pattern", self.name));
        }
        if self.variables.is_empty() {
            return Err(format!("source '{}' lists no variables", self.name));
        }
        Ok(())
    }
}
