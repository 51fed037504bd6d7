//! Differences and reductions over gridded fields.

use climate_common::{ClimateError, GriddedField, LeadingAxis, Result, Variable};
use ndarray::{Array3, ArrayD, Axis, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Name of the variable holding `a - b` in a difference field.
pub const DIFFERENCE_VARIABLE: &str = "diff";

/// `field_a[variable_a] - field_b[variable_b]`, cell by cell.
///
/// Both fields must share the leading axis exactly and the grid within
/// `tolerance`; nothing is broadcast or reindexed. A cell is undefined when
/// either operand is.
pub fn difference(
    field_a: &GriddedField,
    field_b: &GriddedField,
    variable_a: &str,
    variable_b: &str,
    tolerance: f64,
) -> Result<GriddedField> {
    if field_a.leading != field_b.leading {
        return Err(ClimateError::grid_mismatch(format!(
            "leading axes differ: {} of {} vs {} of {}",
            field_a.leading.kind(),
            field_a.leading.len(),
            field_b.leading.kind(),
            field_b.leading.len()
        )));
    }
    field_a.grid.ensure_matches(&field_b.grid, tolerance)?;

    let a = field_a.variable(variable_a)?;
    let b = field_b.variable(variable_b)?;

    // NaN propagates through subtraction
    let data = Zip::from(&a.data).and(&b.data).map_collect(|&x, &y| x - y);

    let mut diff = Variable::new(data)
        .with_long_name(format!("{} minus {}", variable_a, variable_b));
    if a.units.is_some() && a.units == b.units {
        diff.units = a.units.clone();
    }

    debug!(variable_a, variable_b, defined = diff.defined_count(), "Computed difference");

    let mut out = field_a.empty_like();
    out.insert_variable(DIFFERENCE_VARIABLE, diff)?;
    Ok(out)
}

/// An axis of a (leading, lat, lon) field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dim {
    Leading,
    Lat,
    Lon,
}

impl Dim {
    fn axis(self) -> usize {
        match self {
            Dim::Leading => 0,
            Dim::Lat => 1,
            Dim::Lon => 2,
        }
    }
}

/// Mean of `variable` over `dims`, weighted by `cos(latitude)`.
///
/// Undefined cells drop out of both the weighted sum and the weight total.
/// The result keeps the remaining axes in their original order; an entry
/// with no defined cell is NaN. This approximates a spherical-area mean.
pub fn area_weighted_mean(field: &GriddedField, variable: &str, dims: &[Dim]) -> Result<ArrayD<f64>> {
    let var = field.variable(variable)?;
    let weights: Vec<f64> = field.grid.lat.iter().map(|lat| lat.to_radians().cos()).collect();

    let (nlead, nlat, nlon) = var.data.dim();
    let mut numerator = Array3::<f64>::zeros((nlead, nlat, nlon));
    let mut denominator = Array3::<f64>::zeros((nlead, nlat, nlon));
    Zip::indexed(&var.data)
        .and(&mut numerator)
        .and(&mut denominator)
        .for_each(|(_, i, _), &v, num, den| {
            if !v.is_nan() {
                *num = v as f64 * weights[i];
                *den = weights[i];
            }
        });

    let mut axes: Vec<usize> = dims.iter().map(|d| d.axis()).collect();
    axes.sort_unstable();
    axes.dedup();

    let mut num = numerator.into_dyn();
    let mut den = denominator.into_dyn();
    // Highest axis first so lower indices stay valid
    for &axis in axes.iter().rev() {
        num = num.sum_axis(Axis(axis));
        den = den.sum_axis(Axis(axis));
    }

    Ok(Zip::from(&num)
        .and(&den)
        .map_collect(|&n, &d| if d > 0.0 { n / d } else { f64::NAN }))
}

/// Area-weighted mean over every cell; `None` when nothing is defined.
pub fn area_weighted_mean_all(field: &GriddedField, variable: &str) -> Result<Option<f64>> {
    let reduced = area_weighted_mean(field, variable, &[Dim::Leading, Dim::Lat, Dim::Lon])?;
    Ok(reduced.iter().next().copied().filter(|v| !v.is_nan()))
}

/// Area-weighted spatial mean for each leading step; `None` where a step
/// has no defined cell.
pub fn spatial_mean_series(field: &GriddedField, variable: &str) -> Result<Vec<Option<f64>>> {
    let reduced = area_weighted_mean(field, variable, &[Dim::Lat, Dim::Lon])?;
    Ok(reduced
        .iter()
        .map(|&v| if v.is_nan() { None } else { Some(v) })
        .collect())
}

/// Per-cell reduction along the leading axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduction {
    Mean,
    Max,
    Min,
}

/// Collapse the leading axis of `variable` cell by cell, skipping
/// undefined values.
///
/// The result is a static field holding only `variable`. A cell undefined
/// at every step stays undefined.
pub fn reduce_leading(field: &GriddedField, variable: &str, reduction: Reduction) -> Result<GriddedField> {
    let var = field.variable(variable)?;
    let (_, nlat, nlon) = var.data.dim();

    let reduced = var.data.map_axis(Axis(0), |series| {
        let defined = series.iter().copied().filter(|v| !v.is_nan());
        match reduction {
            Reduction::Mean => {
                let (sum, count) = defined.fold((0.0f64, 0usize), |(s, c), v| (s + v as f64, c + 1));
                if count == 0 {
                    f32::NAN
                } else {
                    (sum / count as f64) as f32
                }
            }
            Reduction::Max => defined.fold(f32::NAN, f32::max),
            Reduction::Min => defined.fold(f32::NAN, f32::min),
        }
    });

    let data = reduced
        .into_shape((1, nlat, nlon))
        .map_err(|e| ClimateError::invalid_field(e.to_string()))?;

    let mut out = GriddedField::new(field.names.clone(), LeadingAxis::Static, field.grid.clone());
    out.insert_variable(variable, var.with_data(data))?;
    Ok(out)
}
