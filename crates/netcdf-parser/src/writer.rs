//! Writing gridded fields to netCDF.

use std::path::{Path, PathBuf};

use climate_common::{CfTimeUnits, ClimateError, GriddedField, LeadingAxis};
use tracing::{debug, info, warn};

use crate::error::NetCdfResult;
use crate::native::{silence_hdf5_errors, temp_sibling};

/// Fill value written for undefined cells (netCDF default float fill).
pub const FILL_VALUE_F32: f32 = 9.969_209_968_386_869e36;

/// Write a field to `path` atomically.
///
/// The file is written to a hidden sibling and renamed into place once it
/// is complete, so readers never see a partial file. On failure the
/// sibling is removed and `path` is left as it was.
pub fn persist(field: &GriddedField, path: &Path) -> climate_common::Result<()> {
    let mut outputs = OutputSet::new();
    outputs.stage_field(field, path)?;
    outputs.commit()?;
    Ok(())
}

/// A group of output files published together.
///
/// Each output is first written to a hidden sibling of its destination.
/// [`commit`](OutputSet::commit) then renames them into place in staging
/// order; if any rename fails, the outputs already published are removed
/// and files they replaced are restored. Dropping an uncommitted set
/// removes its scratch files.
#[derive(Debug, Default)]
pub struct OutputSet {
    staged: Vec<Staged>,
}

#[derive(Debug)]
struct Staged {
    scratch: PathBuf,
    destination: PathBuf,
}

/// A destination published by [`OutputSet::commit`], with the file it
/// replaced moved aside until the whole set is in place.
struct Published {
    destination: PathBuf,
    backup: Option<PathBuf>,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Destinations in staging order.
    pub fn destinations(&self) -> Vec<&Path> {
        self.staged.iter().map(|s| s.destination.as_path()).collect()
    }

    /// Write `field` as netCDF to a scratch sibling of `path`.
    pub fn stage_field(&mut self, field: &GriddedField, path: &Path) -> climate_common::Result<()> {
        silence_hdf5_errors();
        field.validate()?;

        self.stage_with(path, |scratch| {
            write_field(field, scratch).map_err(|e| e.into_persist_error(path))
        })?;

        debug!(
            path = %path.display(),
            shape = ?field.shape(),
            variables = ?field.variable_names(),
            "Staged field"
        );
        Ok(())
    }

    /// Stage an output produced by `write`, which receives the scratch path.
    pub fn stage_with<F>(&mut self, path: &Path, write: F) -> climate_common::Result<()>
    where
        F: FnOnce(&Path) -> climate_common::Result<()>,
    {
        let scratch = temp_sibling(path);
        if let Err(e) = write(&scratch) {
            let _ = std::fs::remove_file(&scratch);
            return Err(e);
        }

        self.staged.push(Staged {
            scratch,
            destination: path.to_path_buf(),
        });
        Ok(())
    }

    /// Publish every staged output, or none of them.
    pub fn commit(mut self) -> climate_common::Result<Vec<PathBuf>> {
        let staged = std::mem::take(&mut self.staged);
        let mut published: Vec<Published> = Vec::with_capacity(staged.len());

        for (k, output) in staged.iter().enumerate() {
            match publish(output) {
                Ok(done) => published.push(done),
                Err(e) => {
                    for rest in &staged[k..] {
                        let _ = std::fs::remove_file(&rest.scratch);
                    }
                    roll_back(published);
                    warn!(
                        path = %output.destination.display(),
                        error = %e,
                        "Output set rolled back"
                    );
                    return Err(ClimateError::persist(&output.destination, e.to_string()));
                }
            }
        }

        let mut paths = Vec::with_capacity(published.len());
        for done in published {
            if let Some(backup) = &done.backup {
                let _ = std::fs::remove_file(backup);
            }
            info!(path = %done.destination.display(), "Persisted output");
            paths.push(done.destination);
        }
        Ok(paths)
    }
}

impl Drop for OutputSet {
    fn drop(&mut self) {
        for output in &self.staged {
            let _ = std::fs::remove_file(&output.scratch);
        }
    }
}

fn publish(output: &Staged) -> std::io::Result<Published> {
    let backup = if output.destination.is_file() {
        let backup = temp_sibling(&output.destination);
        std::fs::rename(&output.destination, &backup)?;
        Some(backup)
    } else {
        None
    };

    if let Err(e) = std::fs::rename(&output.scratch, &output.destination) {
        if let Some(backup) = &backup {
            let _ = std::fs::rename(backup, &output.destination);
        }
        return Err(e);
    }

    Ok(Published {
        destination: output.destination.clone(),
        backup,
    })
}

/// Undo published outputs, newest first.
fn roll_back(published: Vec<Published>) {
    for done in published.into_iter().rev() {
        let _ = std::fs::remove_file(&done.destination);
        if let Some(backup) = done.backup {
            let _ = std::fs::rename(&backup, &done.destination);
        }
    }
}

/// Write a field as CF-style netCDF. The file is closed on return.
fn write_field(field: &GriddedField, path: &Path) -> NetCdfResult<()> {
    let mut file = netcdf::create(path)?;
    file.add_attribute("Conventions", "CF-1.8")?;

    let names = &field.names;
    let (nlead, nlat, nlon) = field.shape();
    let has_leading = !matches!(field.leading, LeadingAxis::Static);

    if has_leading {
        file.add_dimension(&names.leading, nlead)?;
    }
    file.add_dimension(&names.lat, nlat)?;
    file.add_dimension(&names.lon, nlon)?;

    match &field.leading {
        LeadingAxis::Time(times) => {
            let units = CfTimeUnits::default();
            let values: Vec<f64> = times.iter().map(|t| units.encode(t)).collect();
            let mut var = file.add_variable::<f64>(&names.leading, &[names.leading.as_str()])?;
            var.put_attribute("units", units.to_units_string())?;
            var.put_attribute("calendar", "standard")?;
            var.put_attribute("standard_name", "time")?;
            var.put_values(&values, ..)?;
        }
        LeadingAxis::Month(months) => {
            let values: Vec<i32> = months.iter().map(|&m| m as i32).collect();
            let mut var = file.add_variable::<i32>(&names.leading, &[names.leading.as_str()])?;
            var.put_attribute("long_name", "month of year")?;
            var.put_values(&values, ..)?;
        }
        LeadingAxis::Static => {}
    }

    {
        let mut var = file.add_variable::<f64>(&names.lat, &[names.lat.as_str()])?;
        var.put_attribute("units", "degrees_north")?;
        var.put_attribute("standard_name", "latitude")?;
        var.put_values(&field.grid.lat, ..)?;
    }
    {
        let mut var = file.add_variable::<f64>(&names.lon, &[names.lon.as_str()])?;
        var.put_attribute("units", "degrees_east")?;
        var.put_attribute("standard_name", "longitude")?;
        var.put_values(&field.grid.lon, ..)?;
    }

    let dims: Vec<&str> = if has_leading {
        vec![names.leading.as_str(), names.lat.as_str(), names.lon.as_str()]
    } else {
        vec![names.lat.as_str(), names.lon.as_str()]
    };

    for (name, variable) in field.variables() {
        let values: Vec<f32> = variable
            .data
            .iter()
            .map(|&v| if v.is_nan() { FILL_VALUE_F32 } else { v })
            .collect();

        let mut var = file.add_variable::<f32>(name, &dims)?;
        var.put_attribute("_FillValue", FILL_VALUE_F32)?;
        if let Some(units) = &variable.units {
            var.put_attribute("units", units.as_str())?;
        }
        if let Some(long_name) = &variable.long_name {
            var.put_attribute("long_name", long_name.as_str())?;
        }
        var.put_values(&values, ..)?;
    }

    Ok(())
}
