//! Coordinate harmonization.
//!
//! Every field passes through [`normalize`] once after loading. Downstream
//! operations rely on the canonical form it establishes: axes named
//! `lat`/`lon` (plus `time` or `month`), longitudes in `[-180, 180)`, and
//! every axis strictly ascending.

use std::collections::BTreeMap;

use climate_common::{
    ClimateError, CoordinateConvention, GriddedField, LeadingAxis, LongitudeDomain, Result,
    SpatialGrid,
};
use ndarray::Axis;
use tracing::debug;

/// Rename axes and variables according to `mapping` (old name to new name).
///
/// Names absent from the mapping are kept. An empty mapping, or one that
/// matches nothing, returns an identical field.
pub fn rename_coordinates(
    field: &GriddedField,
    mapping: &BTreeMap<String, String>,
) -> Result<GriddedField> {
    let rename = |name: &str| mapping.get(name).cloned().unwrap_or_else(|| name.to_string());

    let mut names = field.names.clone();
    names.leading = rename(&names.leading);
    names.lat = rename(&names.lat);
    names.lon = rename(&names.lon);

    if names.leading == names.lat || names.leading == names.lon || names.lat == names.lon {
        return Err(ClimateError::invalid_field(format!(
            "renaming produces duplicate axis names: {:?}",
            names
        )));
    }

    let mut out = GriddedField::new(names, field.leading.clone(), field.grid.clone());
    for (name, variable) in field.variables() {
        let new_name = rename(name);
        if out.has_variable(&new_name) {
            return Err(ClimateError::invalid_field(format!(
                "renaming produces duplicate variable '{}'",
                new_name
            )));
        }
        out.insert_variable(new_name, variable.clone())?;
    }

    Ok(out)
}

/// Map one longitude into `[-180, 180)`.
///
/// Values already in range are returned unchanged.
pub fn canonical_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        return lon;
    }
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Remap longitude coordinates into `[-180, 180)`.
///
/// Only the coordinate values change; the cell order is left for
/// [`sort_ascending`]. Idempotent.
pub fn normalize_longitude(field: &GriddedField) -> GriddedField {
    if field.grid.longitude_domain() == LongitudeDomain::Centered
        && field.grid.lon.iter().all(|&lon| lon >= -180.0)
    {
        return field.clone();
    }

    let mut out = field.clone();
    out.grid.lon = field.grid.lon.iter().map(|&lon| canonical_longitude(lon)).collect();
    out
}

/// Reorder the field so every axis ascends.
///
/// Lat and lon must be free of duplicates afterwards, otherwise the field
/// is rejected as invalid.
pub fn sort_ascending(field: &GriddedField) -> Result<GriddedField> {
    let lat_order = ascending_order(&field.grid.lat);
    let lon_order = ascending_order(&field.grid.lon);

    let (leading, lead_order) = match &field.leading {
        LeadingAxis::Time(times) => {
            let mut order: Vec<usize> = (0..times.len()).collect();
            order.sort_by_key(|&i| times[i]);
            let sorted = order.iter().map(|&i| times[i]).collect();
            (LeadingAxis::Time(sorted), Some(order))
        }
        LeadingAxis::Month(months) => {
            let mut order: Vec<usize> = (0..months.len()).collect();
            order.sort_by_key(|&i| months[i]);
            let sorted = order.iter().map(|&i| months[i]).collect();
            (LeadingAxis::Month(sorted), Some(order))
        }
        LeadingAxis::Static => (LeadingAxis::Static, None),
    };

    let grid = SpatialGrid::new(
        lat_order.iter().map(|&i| field.grid.lat[i]).collect(),
        lon_order.iter().map(|&i| field.grid.lon[i]).collect(),
    );
    grid.validate()?;

    let mut out = GriddedField::new(field.names.clone(), leading, grid);
    for (name, variable) in field.variables() {
        let mut data = variable.data.select(Axis(1), &lat_order);
        data = data.select(Axis(2), &lon_order);
        if let Some(order) = &lead_order {
            data = data.select(Axis(0), order);
        }
        out.insert_variable(name.clone(), variable.with_data(data))?;
    }

    Ok(out)
}

fn ascending_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    order
}

/// Bring a freshly loaded field into the canonical convention.
pub fn normalize(field: &GriddedField, convention: &CoordinateConvention) -> Result<GriddedField> {
    let renamed = rename_coordinates(field, &convention.rename_map())?;
    let centered = normalize_longitude(&renamed);
    let sorted = sort_ascending(&centered)?;

    debug!(
        from = ?field.names,
        to = ?sorted.names,
        lon_range = ?(sorted.grid.lon.first(), sorted.grid.lon.last()),
        "Normalized field coordinates"
    );

    Ok(sorted)
}
