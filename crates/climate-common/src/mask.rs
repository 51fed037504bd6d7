//! Boolean cell masks.

use ndarray::{Array2, Array3, Axis, Zip};

use crate::error::{ClimateError, Result};
use crate::field::Variable;
use crate::grid::SpatialGrid;

/// Static land (true) / ocean (false) classification.
#[derive(Debug, Clone, PartialEq)]
pub struct LandSeaMask {
    pub grid: SpatialGrid,
    /// Indexed (lat, lon).
    pub land: Array2<bool>,
}

impl LandSeaMask {
    pub fn new(grid: SpatialGrid, land: Array2<bool>) -> Result<Self> {
        check_cells_shape(&grid, &land)?;
        Ok(Self { grid, land })
    }

    pub fn land_count(&self) -> usize {
        self.land.iter().filter(|&&l| l).count()
    }
}

/// Cells adjacent to a cell of the opposite land/ocean class.
#[derive(Debug, Clone, PartialEq)]
pub struct CoastalMask {
    pub grid: SpatialGrid,
    /// Indexed (lat, lon).
    pub coastal: Array2<bool>,
}

impl CoastalMask {
    pub fn new(grid: SpatialGrid, coastal: Array2<bool>) -> Result<Self> {
        check_cells_shape(&grid, &coastal)?;
        Ok(Self { grid, coastal })
    }

    pub fn coastal_count(&self) -> usize {
        self.coastal.iter().filter(|&&c| c).count()
    }

    /// Coastal cells repeated along a leading axis of `leading_len`.
    pub fn to_selection(&self, leading_len: usize) -> SelectionMask {
        SelectionMask::from_cells(&self.coastal, leading_len)
    }
}

fn check_cells_shape(grid: &SpatialGrid, cells: &Array2<bool>) -> Result<()> {
    if cells.dim() != grid.shape() {
        return Err(ClimateError::invalid_field(format!(
            "mask has shape {:?}, grid is {:?}",
            cells.dim(),
            grid.shape()
        )));
    }
    Ok(())
}

/// Per-cell predicate used to subset a field, indexed (leading, lat, lon).
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionMask {
    pub cells: Array3<bool>,
}

impl SelectionMask {
    pub fn new(cells: Array3<bool>) -> Self {
        Self { cells }
    }

    /// Broadcast a (lat, lon) mask along a leading axis.
    pub fn from_cells(cells: &Array2<bool>, leading_len: usize) -> Self {
        let (nlat, nlon) = cells.dim();
        let mut out = Array3::from_elem((leading_len, nlat, nlon), false);
        for mut slice in out.axis_iter_mut(Axis(0)) {
            slice.assign(cells);
        }
        Self { cells: out }
    }

    /// True where `predicate` holds for a defined value of `variable`.
    ///
    /// Undefined cells never satisfy a value predicate.
    pub fn where_values<F>(variable: &Variable, predicate: F) -> Self
    where
        F: Fn(f32) -> bool,
    {
        Self {
            cells: variable.data.mapv(|v| !v.is_nan() && predicate(v)),
        }
    }

    pub fn dim(&self) -> (usize, usize, usize) {
        self.cells.dim()
    }

    /// Number of selected cells.
    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn and(&self, other: &SelectionMask) -> Result<Self> {
        self.combine(other, |a, b| a && b)
    }

    pub fn or(&self, other: &SelectionMask) -> Result<Self> {
        self.combine(other, |a, b| a || b)
    }

    pub fn not(&self) -> Self {
        Self {
            cells: self.cells.mapv(|c| !c),
        }
    }

    fn combine<F>(&self, other: &SelectionMask, op: F) -> Result<Self>
    where
        F: Fn(bool, bool) -> bool,
    {
        if self.dim() != other.dim() {
            return Err(ClimateError::grid_mismatch(format!(
                "selection shapes differ: {:?} vs {:?}",
                self.dim(),
                other.dim()
            )));
        }
        let cells = Zip::from(&self.cells)
            .and(&other.cells)
            .map_collect(|&a, &b| op(a, b));
        Ok(Self { cells })
    }
}
