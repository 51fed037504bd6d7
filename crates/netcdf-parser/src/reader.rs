//! Reading gridded fields from netCDF files.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use climate_common::{
    AxisNames, CfTimeUnits, ClimateError, CoordinateConvention, GriddedField, LeadingAxis,
    SourceSpec, SpatialGrid, Variable, DEFAULT_GRID_TOLERANCE, MONTH_AXIS,
};
use ndarray::{concatenate, Array3, ArrayView3, Axis};
use tracing::{debug, info, warn};

use crate::error::{NetCdfError, NetCdfResult};
use crate::locator::locate_files;
use crate::native::silence_hdf5_errors;

/// Load every file of a source and concatenate them along time.
///
/// The result keeps the source's own coordinate convention; callers
/// normalize it. Files must share one spatial grid.
pub fn load_timeseries(spec: &SourceSpec) -> climate_common::Result<GriddedField> {
    let paths = locate_files(&spec.directory, &spec.pattern)
        .map_err(|e| e.into_load_error(&spec.directory))?;

    info!(
        source = %spec.name,
        files = paths.len(),
        variables = ?spec.variables,
        "Loading source time series"
    );

    let mut parts = Vec::with_capacity(paths.len());
    for path in &paths {
        let part = read_field(path, &spec.variables, &spec.convention)
            .map_err(|e| e.into_load_error(path))?;
        debug!(path = %path.display(), steps = part.leading.len(), "Read source file");
        parts.push((path.clone(), part));
    }

    let field = concat_along_time(parts)?;

    info!(
        source = %spec.name,
        shape = ?field.shape(),
        "Loaded source time series"
    );

    Ok(field)
}

/// Load a single file, reporting failures as DataLoad errors.
pub fn load_field(
    path: &Path,
    variables: &[String],
    convention: &CoordinateConvention,
) -> climate_common::Result<GriddedField> {
    read_field(path, variables, convention).map_err(|e| e.into_load_error(path))
}

/// Load a monthly climatology written by [`persist`](crate::persist).
pub fn load_climatology(path: &Path, variables: &[String]) -> climate_common::Result<GriddedField> {
    load_field(path, variables, &CoordinateConvention::default())
}

/// Read the named variables of one file into a field.
///
/// Variables must be laid out `(leading, lat, lon)` or `(lat, lon)`. The
/// leading dimension is either the convention's time axis (decoded from its
/// CF units) or a `month` axis. Packed values are unpacked and fill values
/// become NaN.
pub fn read_field(
    path: &Path,
    variables: &[String],
    convention: &CoordinateConvention,
) -> NetCdfResult<GriddedField> {
    silence_hdf5_errors();

    let file = netcdf::open(path)?;

    let first_name = variables
        .first()
        .ok_or_else(|| NetCdfError::MissingData("no variables requested".to_string()))?;
    let first = file
        .variable(first_name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", first_name)))?;

    let dims = dimension_names(&first);
    let leading_dim = detect_layout(&dims, convention)?;

    let lat = read_coordinate(&file, &convention.lat)?;
    let lon = read_coordinate(&file, &convention.lon)?;
    let grid = SpatialGrid::new(lat, lon);

    let (leading, names) = match leading_dim {
        None => (
            LeadingAxis::Static,
            AxisNames::new(convention.time.as_str(), convention.lat.as_str(), convention.lon.as_str()),
        ),
        Some(dim) if dim == convention.time => (
            LeadingAxis::Time(read_time_axis(&file, &dim)?),
            AxisNames::new(dim, convention.lat.as_str(), convention.lon.as_str()),
        ),
        Some(dim) if dim == MONTH_AXIS => (
            LeadingAxis::Month(read_month_axis(&file, &dim)?),
            AxisNames::new(dim, convention.lat.as_str(), convention.lon.as_str()),
        ),
        Some(dim) => {
            return Err(NetCdfError::InvalidFormat(format!(
                "unsupported leading dimension '{}' (expected '{}' or '{}')",
                dim, convention.time, MONTH_AXIS
            )))
        }
    };

    let mut field = GriddedField::new(names, leading, grid);
    let shape = field.shape();

    for name in variables {
        let var = file
            .variable(name)
            .ok_or_else(|| NetCdfError::MissingData(format!("{} variable", name)))?;

        if dimension_names(&var) != dims {
            return Err(NetCdfError::InvalidFormat(format!(
                "variable '{}' has dimensions {:?}, expected {:?}",
                name,
                dimension_names(&var),
                dims
            )));
        }

        let values = read_unpacked(&var)?;
        let data = Array3::from_shape_vec(shape, values)
            .map_err(|e| NetCdfError::InvalidFormat(format!("variable '{}': {}", name, e)))?;

        let mut variable = Variable::new(data);
        variable.units = get_string_attr(&var, "units");
        variable.long_name = get_string_attr(&var, "long_name");
        field.insert_variable(name.clone(), variable)?;
    }

    Ok(field)
}

/// Concatenate per-file fields along their time axis, sorted by time.
fn concat_along_time(parts: Vec<(PathBuf, GriddedField)>) -> climate_common::Result<GriddedField> {
    let mut iter = parts.into_iter();
    let (first_path, first) = match iter.next() {
        Some(part) => part,
        None => return Err(ClimateError::invalid_field("no files to concatenate")),
    };

    let rest: Vec<(PathBuf, GriddedField)> = iter.collect();
    if rest.is_empty() {
        return Ok(first);
    }

    let mut times: Vec<DateTime<Utc>> = time_axis(&first_path, &first)?.to_vec();
    for (path, part) in &rest {
        first.grid.ensure_matches(&part.grid, DEFAULT_GRID_TOLERANCE).map_err(|e| {
            NetCdfError::IncompatibleGrid(format!(
                "{} differs from {}: {}",
                path.display(),
                first_path.display(),
                e
            ))
            .into_load_error(path)
        })?;
        times.extend_from_slice(time_axis(path, part)?);
    }

    // Chronological order regardless of file naming
    let mut order: Vec<usize> = (0..times.len()).collect();
    order.sort_by_key(|&i| times[i]);
    let sorted_times: Vec<DateTime<Utc>> = order.iter().map(|&i| times[i]).collect();
    if sorted_times.windows(2).any(|w| w[0] == w[1]) {
        warn!(path = %first_path.display(), "Duplicate timestamps across source files");
    }

    let mut out = GriddedField::new(
        first.names.clone(),
        LeadingAxis::Time(sorted_times),
        first.grid.clone(),
    );

    for (name, variable) in first.variables() {
        let mut views: Vec<ArrayView3<f32>> = vec![variable.data.view()];
        for (path, part) in &rest {
            let other = part.variable(name).map_err(|_| {
                ClimateError::data_load(path, format!("variable '{}' missing", name))
            })?;
            views.push(other.data.view());
        }

        let joined = concatenate(Axis(0), &views)
            .map_err(|e| ClimateError::data_load(&first_path, e.to_string()))?;
        out.insert_variable(name.clone(), variable.with_data(joined.select(Axis(0), &order)))?;
    }

    Ok(out)
}

fn time_axis<'a>(path: &Path, field: &'a GriddedField) -> climate_common::Result<&'a [DateTime<Utc>]> {
    field.leading.times().ok_or_else(|| {
        ClimateError::data_load(
            path,
            format!(
                "cannot concatenate along time: file has a {} axis",
                field.leading.kind()
            ),
        )
    })
}

fn dimension_names(var: &netcdf::Variable) -> Vec<String> {
    var.dimensions().iter().map(|d| d.name()).collect()
}

/// Name of the leading dimension, or `None` for a (lat, lon) variable.
fn detect_layout(dims: &[String], convention: &CoordinateConvention) -> NetCdfResult<Option<String>> {
    let spatial_ok = |lat: &String, lon: &String| *lat == convention.lat && *lon == convention.lon;

    match dims {
        [lat, lon] if spatial_ok(lat, lon) => Ok(None),
        [lead, lat, lon] if spatial_ok(lat, lon) => Ok(Some(lead.clone())),
        _ => Err(NetCdfError::InvalidFormat(format!(
            "expected dimensions (leading, {lat}, {lon}) or ({lat}, {lon}), found {:?}",
            dims,
            lat = convention.lat,
            lon = convention.lon
        ))),
    }
}

fn read_coordinate(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<f64>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate", name)))?;
    let values: Vec<f64> = var.get_values(..)?;
    Ok(values)
}

fn read_time_axis(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<DateTime<Utc>>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate", name)))?;
    let units = get_string_attr(&var, "units")
        .ok_or_else(|| NetCdfError::MissingData(format!("units attribute of {}", name)))?;
    let units = CfTimeUnits::parse(&units)?;

    let values: Vec<f64> = var.get_values(..)?;
    values
        .into_iter()
        .map(|v| units.decode(v).map_err(NetCdfError::from))
        .collect()
}

fn read_month_axis(file: &netcdf::File, name: &str) -> NetCdfResult<Vec<u32>> {
    let var = file
        .variable(name)
        .ok_or_else(|| NetCdfError::MissingData(format!("{} coordinate", name)))?;
    let values: Vec<i32> = var.get_values(..)?;

    values
        .into_iter()
        .map(|m| match u32::try_from(m) {
            Ok(m) if (1..=12).contains(&m) => Ok(m),
            _ => Err(NetCdfError::InvalidFormat(format!("month value {} outside 1..=12", m))),
        })
        .collect()
}

/// Read a data variable as f32, applying fill values and packing.
fn read_unpacked(var: &netcdf::Variable) -> NetCdfResult<Vec<f32>> {
    let raw: Vec<f32> = var.get_values(..)?;

    let scale_factor = get_f64_attr(var, "scale_factor").unwrap_or(1.0);
    let add_offset = get_f64_attr(var, "add_offset").unwrap_or(0.0);
    let fill_values: Vec<f64> = ["_FillValue", "missing_value"]
        .iter()
        .filter_map(|name| get_f64_attr(var, name))
        .collect();
    let packed = scale_factor != 1.0 || add_offset != 0.0;

    Ok(raw
        .into_iter()
        .map(|val| {
            let v = val as f64;
            if val.is_nan() || fill_values.iter().any(|&fill| fill == v) {
                f32::NAN
            } else if packed {
                (v * scale_factor + add_offset) as f32
            } else {
                val
            }
        })
        .collect())
}

// =============================================================================
// Attribute helpers
// =============================================================================

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Helper to get a numeric attribute as f64.
fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

/// Helper to get a text attribute.
fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        netcdf::AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}
