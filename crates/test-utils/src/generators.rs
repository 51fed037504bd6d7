//! Synthetic field generators.
//!
//! These build small, predictable fields so tests can check every cell of a
//! climatology or a difference by hand.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use climate_common::{AxisNames, GriddedField, LeadingAxis, SpatialGrid, Variable};
use ndarray::Array3;

/// Creates a regular grid.
///
/// `lat` starts at `lat0` and steps by `dlat` (negative for descending,
/// as ERA5 stores it); `lon` likewise.
///
/// # Example
///
/// ```
/// use test_utils::regular_grid;
///
/// let grid = regular_grid(3, 4, 10.0, -5.0, 0.0, 90.0);
/// assert_eq!(grid.lat, vec![10.0, 5.0, 0.0]);
/// assert_eq!(grid.lon, vec![0.0, 90.0, 180.0, 270.0]);
/// ```
pub fn regular_grid(nlat: usize, nlon: usize, lat0: f64, dlat: f64, lon0: f64, dlon: f64) -> SpatialGrid {
    let lat = (0..nlat).map(|i| lat0 + dlat * i as f64).collect();
    let lon = (0..nlon).map(|j| lon0 + dlon * j as f64).collect();
    SpatialGrid::new(lat, lon)
}

/// Creates an ascending grid with `lon` in `[-180, 180)` and one-degree
/// spacing, starting at (`lat0`, `lon0`).
pub fn canonical_grid(nlat: usize, nlon: usize, lat0: f64, lon0: f64) -> SpatialGrid {
    regular_grid(nlat, nlon, lat0, 1.0, lon0, 1.0)
}

/// Timestamps on the first of each month, `count` months from
/// `start_year`-`start_month`.
pub fn monthly_timestamps(start_year: i32, start_month: u32, count: usize) -> Vec<DateTime<Utc>> {
    let mut out = Vec::with_capacity(count);
    let (mut year, mut month) = (start_year, start_month);
    for _ in 0..count {
        out.push(Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).unwrap());
        month += 1;
        if month > 12 {
            month = 1;
            year += 1;
        }
    }
    out
}

/// A time series whose cells are computed by `value(timestamp, i_lat, i_lon)`.
pub fn timeseries_from_fn<F>(
    grid: &SpatialGrid,
    times: Vec<DateTime<Utc>>,
    names: AxisNames,
    variable: &str,
    units: Option<&str>,
    value: F,
) -> GriddedField
where
    F: Fn(&DateTime<Utc>, usize, usize) -> f32,
{
    let (nlat, nlon) = grid.shape();
    let data = Array3::from_shape_fn((times.len(), nlat, nlon), |(t, i, j)| value(&times[t], i, j));

    let mut var = Variable::new(data);
    if let Some(units) = units {
        var = var.with_units(units);
    }

    GriddedField::new(names, LeadingAxis::Time(times), grid.clone())
        .with_variable(variable, var)
        .unwrap()
}

/// A time series with every cell set to `value`, using canonical axis names.
pub fn constant_timeseries(
    grid: &SpatialGrid,
    times: Vec<DateTime<Utc>>,
    variable: &str,
    value: f32,
) -> GriddedField {
    timeseries_from_fn(grid, times, AxisNames::canonical(), variable, None, |_, _, _| value)
}

/// A time series whose value is `month * 10 + offset`, so each calendar
/// month has a recognizable mean.
pub fn seasonal_timeseries(
    grid: &SpatialGrid,
    times: Vec<DateTime<Utc>>,
    variable: &str,
    offset: f32,
) -> GriddedField {
    timeseries_from_fn(grid, times, AxisNames::canonical(), variable, None, |t, _, _| {
        t.month() as f32 * 10.0 + offset
    })
}

/// A 12-month climatology whose cells are computed by `value(month, i_lat, i_lon)`.
pub fn climatology_from_fn<F>(grid: &SpatialGrid, variable: &str, units: Option<&str>, value: F) -> GriddedField
where
    F: Fn(u32, usize, usize) -> f32,
{
    let (nlat, nlon) = grid.shape();
    let data = Array3::from_shape_fn((12, nlat, nlon), |(m, i, j)| value(m as u32 + 1, i, j));

    let mut var = Variable::new(data);
    if let Some(units) = units {
        var = var.with_units(units);
    }

    GriddedField::new(AxisNames::monthly(), LeadingAxis::Month((1..=12).collect()), grid.clone())
        .with_variable(variable, var)
        .unwrap()
}

/// A 12-month climatology with every cell set to `value`.
pub fn constant_climatology(grid: &SpatialGrid, variable: &str, value: f32, units: Option<&str>) -> GriddedField {
    climatology_from_fn(grid, variable, units, |_, _, _| value)
}

/// A land-sea mask field with a single time step, laid out as ERA5 ships it.
///
/// `fraction` is row-major over (`lat`, `lon`).
pub fn land_fraction_field(grid: &SpatialGrid, variable: &str, fraction: &[f32]) -> GriddedField {
    let (nlat, nlon) = grid.shape();
    assert_eq!(fraction.len(), nlat * nlon, "fraction length must match grid");

    let data = Array3::from_shape_vec((1, nlat, nlon), fraction.to_vec()).unwrap();
    let time = monthly_timestamps(1979, 1, 1);

    GriddedField::new(AxisNames::canonical(), LeadingAxis::Time(time), grid.clone())
        .with_variable(variable, Variable::new(data))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_timestamps_roll_over_year() {
        let times = monthly_timestamps(2000, 11, 4);
        let months: Vec<(i32, u32)> = times.iter().map(|t| (t.year(), t.month())).collect();
        assert_eq!(months, vec![(2000, 11), (2000, 12), (2001, 1), (2001, 2)]);
    }

    #[test]
    fn test_seasonal_timeseries_values() {
        let grid = canonical_grid(2, 2, 0.0, 0.0);
        let field = seasonal_timeseries(&grid, monthly_timestamps(2000, 1, 3), "t2m", 0.5);
        let data = &field.variable("t2m").unwrap().data;
        assert_eq!(data[[0, 0, 0]], 10.5);
        assert_eq!(data[[2, 1, 1]], 30.5);
    }

    #[test]
    fn test_constant_climatology_shape() {
        let grid = canonical_grid(3, 4, -1.0, 10.0);
        let field = constant_climatology(&grid, "tmp", 12.0, Some("degrees Celsius"));
        assert_eq!(field.shape(), (12, 3, 4));
        assert_eq!(field.leading.months().unwrap(), &(1..=12).collect::<Vec<u32>>()[..]);
        field.validate().unwrap();
    }

    #[test]
    fn test_land_fraction_field() {
        let grid = regular_grid(2, 2, 1.0, -1.0, 0.0, 1.0);
        let field = land_fraction_field(&grid, "lsm", &[0.0, 1.0, 0.5, 0.0]);
        assert_eq!(field.shape(), (1, 2, 2));
        assert_eq!(field.variable("lsm").unwrap().data[[0, 1, 0]], 0.5);
    }
}
