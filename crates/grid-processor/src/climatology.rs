//! Time windows and monthly climatologies.

use chrono::{DateTime, Datelike, Utc};
use climate_common::{
    AxisNames, ClimateError, GriddedField, LeadingAxis, Result, TimeRange, Variable, MONTH_AXIS,
};
use ndarray::{Array3, Axis, Zip};
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// First and last timestamp of a time-indexed field.
pub fn time_range(field: &GriddedField) -> Result<TimeRange> {
    let times = time_axis(field)?;
    TimeRange::spanning(times)
        .ok_or_else(|| ClimateError::invalid_field("time axis has no samples"))
}

/// Intersection of the time ranges of all `fields`: `(max(starts), min(ends))`.
///
/// Fails with `EmptyWindow` when the sources do not overlap.
pub fn common_time_window(fields: &[&GriddedField]) -> Result<TimeRange> {
    let ranges = fields
        .iter()
        .map(|f| time_range(f))
        .collect::<Result<Vec<_>>>()?;

    let start = ranges.iter().map(|r| r.start).max();
    let end = ranges.iter().map(|r| r.end).min();
    let (start, end) = match (start, end) {
        (Some(start), Some(end)) => (start, end),
        _ => return Err(ClimateError::invalid_field("no fields to intersect")),
    };

    if start > end {
        return Err(ClimateError::EmptyWindow { start, end });
    }

    debug!(%start, %end, sources = fields.len(), "Computed common time window");
    Ok(TimeRange::new(start, end))
}

/// Keep only the time steps inside `window` (inclusive at both ends).
pub fn restrict_to_window(field: &GriddedField, window: &TimeRange) -> Result<GriddedField> {
    let times = time_axis(field)?;
    let keep: Vec<usize> = (0..times.len()).filter(|&i| window.contains(&times[i])).collect();

    if keep.is_empty() {
        return Err(ClimateError::EmptyWindow {
            start: window.start,
            end: window.end,
        });
    }

    let kept: Vec<DateTime<Utc>> = keep.iter().map(|&i| times[i]).collect();
    let mut out = GriddedField::new(field.names.clone(), LeadingAxis::Time(kept), field.grid.clone());
    for (name, variable) in field.variables() {
        out.insert_variable(name.clone(), variable.with_data(variable.data.select(Axis(0), &keep)))?;
    }

    debug!(kept = keep.len(), dropped = times.len() - keep.len(), "Restricted to time window");
    Ok(out)
}

/// Mean of every variable per calendar month, skipping undefined cells.
///
/// The result always has 12 month slices (1..=12) on the input's grid.
/// A cell with no defined sample for a month is undefined in that slice.
pub fn monthly_climatology(field: &GriddedField) -> Result<GriddedField> {
    let times = time_axis(field)?;
    let month_index: Vec<usize> = times.iter().map(|t| t.month0() as usize).collect();

    let mut samples_per_month = [0usize; 12];
    for &m in &month_index {
        samples_per_month[m] += 1;
    }
    let empty: Vec<u32> = (1..=12u32).filter(|m| samples_per_month[*m as usize - 1] == 0).collect();
    if !empty.is_empty() {
        warn!(months = ?empty, "Months without samples will be undefined");
    }

    let entries: Vec<(&String, &Variable)> = field.variables().collect();
    let means: Vec<(String, Variable)> = entries
        .par_iter()
        .map(|(name, variable)| {
            let data = monthly_mean(&variable.data, &month_index);
            ((*name).clone(), variable.with_data(data))
        })
        .collect();

    let names = AxisNames::new(MONTH_AXIS, field.names.lat.as_str(), field.names.lon.as_str());
    let mut out = GriddedField::new(names, LeadingAxis::Month((1..=12).collect()), field.grid.clone());
    for (name, variable) in means {
        out.insert_variable(name, variable)?;
    }

    info!(
        samples = times.len(),
        samples_per_month = ?samples_per_month,
        variables = ?out.variable_names(),
        "Computed monthly climatology"
    );

    Ok(out)
}

fn monthly_mean(data: &Array3<f32>, month_index: &[usize]) -> Array3<f32> {
    let (_, nlat, nlon) = data.dim();
    let mut sum = Array3::<f64>::zeros((12, nlat, nlon));
    let mut count = Array3::<u32>::zeros((12, nlat, nlon));

    for (slice, &m) in data.outer_iter().zip(month_index) {
        Zip::from(sum.index_axis_mut(Axis(0), m))
            .and(count.index_axis_mut(Axis(0), m))
            .and(&slice)
            .for_each(|s, c, &v| {
                if !v.is_nan() {
                    *s += v as f64;
                    *c += 1;
                }
            });
    }

    Zip::from(&sum)
        .and(&count)
        .map_collect(|&s, &c| if c == 0 { f32::NAN } else { (s / c as f64) as f32 })
}

fn time_axis(field: &GriddedField) -> Result<&[DateTime<Utc>]> {
    field.leading.times().ok_or_else(|| {
        ClimateError::invalid_field(format!(
            "expected a time axis, found a {} axis",
            field.leading.kind()
        ))
    })
}
