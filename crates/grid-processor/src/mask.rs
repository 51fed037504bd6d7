//! Land-sea and coastal masks, and masking fields with them.

use climate_common::{
    ClimateError, CoastalMask, CoordinateConvention, GriddedField, LandSeaMask, Result, SelectionMask,
};
use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::normalize::normalize;

/// How grid edges are treated when looking for land/ocean discontinuities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoastalBoundary {
    /// Compare only with neighbours that exist; an edge is never a coast by itself.
    #[default]
    OneSided,
    /// Like `OneSided`, but the first and last longitude columns are neighbours.
    WrapLongitude,
}

/// How to read a raw land-sea mask.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskAlignment {
    /// Variable holding the land fraction.
    pub variable: String,
    /// Axis names used by the mask file.
    pub convention: CoordinateConvention,
    /// A cell is land when its fraction exceeds this value.
    pub land_threshold: f32,
    /// Coordinate tolerance when matching the target grid.
    pub tolerance: f64,
}

/// Bring a raw land-sea mask onto `target`'s grid and classify its cells.
///
/// The mask is renamed, longitude-normalized and sorted like any other
/// field. A leading axis of length one (ERA5 ships the invariant mask with
/// a single time step) is dropped. Undefined fractions count as ocean.
pub fn align_mask_to_field(
    mask: &GriddedField,
    target: &GriddedField,
    alignment: &MaskAlignment,
) -> Result<LandSeaMask> {
    let canonical = normalize(mask, &alignment.convention)?;

    let fraction = canonical.variable(&alignment.variable)?;
    if canonical.leading.len() != 1 {
        return Err(ClimateError::invalid_field(format!(
            "land-sea mask has {} steps along '{}', expected a single one",
            canonical.leading.len(),
            canonical.names.leading
        )));
    }

    canonical
        .grid
        .ensure_matches(&target.grid, alignment.tolerance)
        .map_err(|e| ClimateError::grid_mismatch(format!("land-sea mask vs field: {}", e)))?;

    let threshold = alignment.land_threshold;
    let land: Array2<bool> = fraction
        .data
        .index_axis(Axis(0), 0)
        .mapv(|v| !v.is_nan() && v > threshold);

    let mask = LandSeaMask::new(target.grid.clone(), land)?;
    info!(
        land_cells = mask.land_count(),
        total_cells = mask.grid.len(),
        threshold,
        "Aligned land-sea mask"
    );
    Ok(mask)
}

/// Set every cell of `field` where `selection` is false to undefined.
///
/// Masking, not filtering: axes and shape are unchanged.
pub fn select(field: &GriddedField, selection: &SelectionMask) -> Result<GriddedField> {
    if selection.dim() != field.shape() {
        return Err(ClimateError::grid_mismatch(format!(
            "selection has shape {:?}, field is {:?}",
            selection.dim(),
            field.shape()
        )));
    }

    field.map_variables(|_, variable| {
        let mut data = variable.data.clone();
        data.zip_mut_with(&selection.cells, |v, &keep| {
            if !keep {
                *v = f32::NAN;
            }
        });
        Ok(variable.with_data(data))
    })
}

/// Undefine ocean cells of every variable in `field`.
///
/// The field's grid must match the mask's within `tolerance` degrees.
pub fn apply_land_mask(field: &GriddedField, mask: &LandSeaMask, tolerance: f64) -> Result<GriddedField> {
    field.grid.ensure_matches(&mask.grid, tolerance)?;

    let selection = SelectionMask::from_cells(&mask.land, field.leading.len());
    let masked = select(field, &selection)?;

    debug!(
        ocean_cells = mask.grid.len() - mask.land_count(),
        "Applied land-sea mask"
    );
    Ok(masked)
}

/// Cells whose land/ocean class differs from a lat- or lon-adjacent neighbour.
pub fn derive_coastal_mask(mask: &LandSeaMask, boundary: CoastalBoundary) -> Result<CoastalMask> {
    let land = &mask.land;
    let (nlat, nlon) = land.dim();
    let mut coastal = Array2::from_elem((nlat, nlon), false);

    for i in 0..nlat {
        for j in 0..nlon {
            let here = land[[i, j]];
            let mut neighbours = Vec::with_capacity(4);
            if i > 0 {
                neighbours.push((i - 1, j));
            }
            if i + 1 < nlat {
                neighbours.push((i + 1, j));
            }
            if j > 0 {
                neighbours.push((i, j - 1));
            } else if boundary == CoastalBoundary::WrapLongitude && nlon > 1 {
                neighbours.push((i, nlon - 1));
            }
            if j + 1 < nlon {
                neighbours.push((i, j + 1));
            } else if boundary == CoastalBoundary::WrapLongitude && nlon > 1 {
                neighbours.push((i, 0));
            }

            coastal[[i, j]] = neighbours.iter().any(|&(a, b)| land[[a, b]] != here);
        }
    }

    let coastal = CoastalMask::new(mask.grid.clone(), coastal)?;
    info!(
        coastal_cells = coastal.coastal_count(),
        ?boundary,
        "Derived coastal mask"
    );
    Ok(coastal)
}

/// Broadcast the coastal cells along `field`'s leading axis.
pub fn coastal_selection(
    coastal: &CoastalMask,
    field: &GriddedField,
    tolerance: f64,
) -> Result<SelectionMask> {
    field.grid.ensure_matches(&coastal.grid, tolerance)?;
    Ok(coastal.to_selection(field.leading.len()))
}
