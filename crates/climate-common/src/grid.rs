//! Regular latitude/longitude grids.

use serde::{Deserialize, Serialize};

use crate::error::{ClimateError, Result};

/// Default absolute tolerance (degrees) when comparing coordinate arrays.
pub const DEFAULT_GRID_TOLERANCE: f64 = 1e-6;

/// Longitude domain of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LongitudeDomain {
    /// Longitudes in [-180, 180).
    Centered,
    /// Longitudes in [0, 360).
    ZeroTo360,
}

/// Latitude and longitude coordinate arrays of a field.
///
/// The canonical form has both arrays strictly ascending and longitudes
/// centered on 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialGrid {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
}

impl SpatialGrid {
    /// Create a grid from coordinate arrays.
    pub fn new(lat: Vec<f64>, lon: Vec<f64>) -> Self {
        Self { lat, lon }
    }

    /// Grid shape as (nlat, nlon).
    pub fn shape(&self) -> (usize, usize) {
        (self.lat.len(), self.lon.len())
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.lat.len() * self.lon.len()
    }

    /// Check if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.lat.is_empty() || self.lon.is_empty()
    }

    /// Detect which longitude convention the grid uses.
    ///
    /// Any longitude at or beyond 180 means the 0-360 convention.
    pub fn longitude_domain(&self) -> LongitudeDomain {
        if self.lon.iter().any(|&lon| lon >= 180.0) {
            LongitudeDomain::ZeroTo360
        } else {
            LongitudeDomain::Centered
        }
    }

    /// Whether the grid already satisfies the canonical convention.
    pub fn is_canonical(&self) -> bool {
        self.longitude_domain() == LongitudeDomain::Centered
            && is_strictly_ascending(&self.lat)
            && is_strictly_ascending(&self.lon)
    }

    /// Check that both axes are strictly monotonic (either direction).
    pub fn validate(&self) -> Result<()> {
        check_strictly_monotonic("lat", &self.lat)?;
        check_strictly_monotonic("lon", &self.lon)
    }

    /// Require `other` to have the same coordinates within `tolerance`.
    ///
    /// The error message names the axis and the first differing index.
    pub fn ensure_matches(&self, other: &SpatialGrid, tolerance: f64) -> Result<()> {
        compare_axis("lat", &self.lat, &other.lat, tolerance)?;
        compare_axis("lon", &self.lon, &other.lon, tolerance)
    }
}

fn compare_axis(name: &str, a: &[f64], b: &[f64], tolerance: f64) -> Result<()> {
    if a.len() != b.len() {
        return Err(ClimateError::grid_mismatch(format!(
            "{} length differs: {} vs {}",
            name,
            a.len(),
            b.len()
        )));
    }

    if let Some((i, (x, y))) = a
        .iter()
        .zip(b)
        .enumerate()
        // NaN coordinates never match
        .find(|(_, (x, y))| !((*x - *y).abs() <= tolerance))
    {
        return Err(ClimateError::grid_mismatch(format!(
            "{}[{}] differs: {} vs {}",
            name, i, x, y
        )));
    }

    Ok(())
}

/// Whether values strictly increase.
pub fn is_strictly_ascending(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

/// Whether values strictly decrease.
pub fn is_strictly_descending(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] > w[1])
}

/// Fail with InvalidField unless `values` is strictly monotonic.
pub fn check_strictly_monotonic(name: &str, values: &[f64]) -> Result<()> {
    if is_strictly_ascending(values) || is_strictly_descending(values) {
        Ok(())
    } else {
        Err(ClimateError::invalid_field(format!(
            "{} coordinate is not strictly monotonic",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longitude_domain_detection() {
        let centered = SpatialGrid::new(vec![0.0], vec![-179.5, 0.0, 179.5]);
        assert_eq!(centered.longitude_domain(), LongitudeDomain::Centered);

        let shifted = SpatialGrid::new(vec![0.0], vec![0.0, 180.0, 359.75]);
        assert_eq!(shifted.longitude_domain(), LongitudeDomain::ZeroTo360);
    }

    #[test]
    fn test_is_canonical() {
        assert!(SpatialGrid::new(vec![-1.0, 1.0], vec![-10.0, 10.0]).is_canonical());
        // ERA5 ships latitude north to south
        assert!(!SpatialGrid::new(vec![1.0, -1.0], vec![-10.0, 10.0]).is_canonical());
        assert!(!SpatialGrid::new(vec![-1.0, 1.0], vec![10.0, 350.0]).is_canonical());
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let grid = SpatialGrid::new(vec![0.0, 0.0], vec![1.0, 2.0]);
        assert!(grid.validate().is_err());

        let descending = SpatialGrid::new(vec![90.0, 0.0, -90.0], vec![1.0, 2.0]);
        assert!(descending.validate().is_ok());
    }

    #[test]
    fn test_ensure_matches_within_tolerance() {
        let a = SpatialGrid::new(vec![-0.25, 0.25], vec![10.0, 10.5]);
        let b = SpatialGrid::new(vec![-0.25, 0.25 + 1e-9], vec![10.0, 10.5]);
        assert!(a.ensure_matches(&b, DEFAULT_GRID_TOLERANCE).is_ok());
    }

    #[test]
    fn test_ensure_matches_reports_axis() {
        let a = SpatialGrid::new(vec![-0.25, 0.25], vec![10.0, 10.5]);
        let b = SpatialGrid::new(vec![-0.25, 0.75], vec![10.0, 10.5]);
        let err = a.ensure_matches(&b, DEFAULT_GRID_TOLERANCE).unwrap_err();
        assert!(matches!(err, ClimateError::GridMismatch(_)));
        assert!(err.to_string().contains("lat[1]"));

        let c = SpatialGrid::new(vec![-0.25, 0.25], vec![10.0]);
        let err = a.ensure_matches(&c, DEFAULT_GRID_TOLERANCE).unwrap_err();
        assert!(err.to_string().contains("lon length"));
    }

    #[test]
    fn test_ensure_matches_rejects_nan_coordinates() {
        let a = SpatialGrid::new(vec![-0.25, 0.25], vec![10.0, 10.5]);
        let b = SpatialGrid::new(vec![-0.25, 0.25], vec![10.0, f64::NAN]);
        let err = b.ensure_matches(&a, 1.0).unwrap_err();
        assert!(err.to_string().contains("lon[1]"));
        assert!(b.ensure_matches(&b, 1.0).is_err());
    }
}
