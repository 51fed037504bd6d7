//! Gridded fields: named variables over (leading, lat, lon).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, Result};
use crate::grid::SpatialGrid;

/// Canonical name of the month-of-year axis.
pub const MONTH_AXIS: &str = "month";

/// Names of the three axes of a field as they appear in its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisNames {
    pub leading: String,
    pub lat: String,
    pub lon: String,
}

impl AxisNames {
    pub fn new(
        leading: impl Into<String>,
        lat: impl Into<String>,
        lon: impl Into<String>,
    ) -> Self {
        Self {
            leading: leading.into(),
            lat: lat.into(),
            lon: lon.into(),
        }
    }

    /// Canonical names for a time-indexed field.
    pub fn canonical() -> Self {
        Self::new("time", "lat", "lon")
    }

    /// Canonical names for a month-indexed field.
    pub fn monthly() -> Self {
        Self::new(MONTH_AXIS, "lat", "lon")
    }
}

impl Default for AxisNames {
    fn default() -> Self {
        Self::canonical()
    }
}

/// The first axis of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum LeadingAxis {
    /// Continuous timestamps.
    Time(Vec<DateTime<Utc>>),
    /// Month of year, 1..=12.
    Month(Vec<u32>),
    /// No leading axis; data carries a single slice.
    Static,
}

impl LeadingAxis {
    pub fn len(&self) -> usize {
        match self {
            Self::Time(times) => times.len(),
            Self::Month(months) => months.len(),
            Self::Static => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Time(_) => "time",
            Self::Month(_) => "month",
            Self::Static => "static",
        }
    }

    pub fn times(&self) -> Option<&[DateTime<Utc>]> {
        match self {
            Self::Time(times) => Some(times),
            _ => None,
        }
    }

    pub fn months(&self) -> Option<&[u32]> {
        match self {
            Self::Month(months) => Some(months),
            _ => None,
        }
    }
}

/// One physical variable. Undefined cells hold NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Values indexed (leading, lat, lon).
    pub data: Array3<f32>,
    pub units: Option<String>,
    pub long_name: Option<String>,
}

impl Variable {
    pub fn new(data: Array3<f32>) -> Self {
        Self {
            data,
            units: None,
            long_name: None,
        }
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    /// Same attributes, new values.
    pub fn with_data(&self, data: Array3<f32>) -> Self {
        Self {
            data,
            units: self.units.clone(),
            long_name: self.long_name.clone(),
        }
    }

    /// Number of defined (non-NaN) cells.
    pub fn defined_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }
}

/// A set of variables sharing one leading axis and one spatial grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GriddedField {
    pub names: AxisNames,
    pub leading: LeadingAxis,
    pub grid: SpatialGrid,
    variables: BTreeMap<String, Variable>,
}

impl GriddedField {
    /// Create a field with no variables.
    pub fn new(names: AxisNames, leading: LeadingAxis, grid: SpatialGrid) -> Self {
        Self {
            names,
            leading,
            grid,
            variables: BTreeMap::new(),
        }
    }

    /// Expected data shape (leading, lat, lon).
    pub fn shape(&self) -> (usize, usize, usize) {
        let (nlat, nlon) = self.grid.shape();
        (self.leading.len(), nlat, nlon)
    }

    /// Add a variable, checking its shape against the axes.
    pub fn insert_variable(&mut self, name: impl Into<String>, variable: Variable) -> Result<()> {
        let name = name.into();
        let expected = self.shape();
        if variable.data.dim() != expected {
            return Err(ClimateError::invalid_field(format!(
                "variable '{}' has shape {:?}, axes require {:?}",
                name,
                variable.data.dim(),
                expected
            )));
        }
        self.variables.insert(name, variable);
        Ok(())
    }

    /// Builder form of [`insert_variable`](Self::insert_variable).
    pub fn with_variable(mut self, name: impl Into<String>, variable: Variable) -> Result<Self> {
        self.insert_variable(name, variable)?;
        Ok(self)
    }

    pub fn variable(&self, name: &str) -> Result<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| ClimateError::MissingVariable(name.to_string()))
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (&String, &Variable)> {
        self.variables.iter()
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables.keys().map(String::as_str).collect()
    }

    /// New field on the same axes with every variable passed through `f`.
    pub fn map_variables<F>(&self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str, &Variable) -> Result<Variable>,
    {
        let mut out = self.empty_like();
        for (name, variable) in &self.variables {
            out.insert_variable(name.clone(), f(name, variable)?)?;
        }
        Ok(out)
    }

    /// Same axes, no variables.
    pub fn empty_like(&self) -> Self {
        Self::new(self.names.clone(), self.leading.clone(), self.grid.clone())
    }

    /// Check the coordinate and shape invariants.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        if let LeadingAxis::Month(months) = &self.leading {
            if let Some(bad) = months.iter().find(|m| !(1..=12).contains(*m)) {
                return Err(ClimateError::invalid_field(format!(
                    "month value {} outside 1..=12",
                    bad
                )));
            }
        }
        let expected = self.shape();
        for (name, variable) in &self.variables {
            if variable.data.dim() != expected {
                return Err(ClimateError::invalid_field(format!(
                    "variable '{}' has shape {:?}, axes require {:?}",
                    name,
                    variable.data.dim(),
                    expected
                )));
            }
        }
        Ok(())
    }
}
