//! Raw time series to monthly climatologies.

use std::path::PathBuf;

use climate_common::{ClimateError, GriddedField, Result, SourceSpec, TimeRange};
use netcdf_parser::{load_timeseries, OutputSet};
use rayon::prelude::*;
use tracing::info;

use crate::climatology::{common_time_window, monthly_climatology, restrict_to_window};
use crate::config::AggregatorConfig;
use crate::normalize::normalize;

/// One climatology written by [`aggregate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutput {
    pub source: String,
    pub path: PathBuf,
    pub window: TimeRange,
    /// Time steps inside the window.
    pub samples: usize,
}

/// Load every source, restrict all to their common time window, and write
/// one monthly climatology per source.
///
/// All climatologies are computed before any file is written, and the files
/// are published as one set: a failing source or write leaves no output
/// behind.
pub fn aggregate(config: &AggregatorConfig) -> Result<Vec<AggregateOutput>> {
    config.validate().map_err(ClimateError::Config)?;

    let mut loaded: Vec<(&SourceSpec, GriddedField)> = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let raw = load_timeseries(source)?;
        loaded.push((source, normalize(&raw, &source.convention)?));
    }

    let fields: Vec<&GriddedField> = loaded.iter().map(|(_, field)| field).collect();
    let window = resolve_window(&fields, config.time_window.as_ref())?;
    info!(
        start = %window.start,
        end = %window.end,
        sources = loaded.len(),
        "Aggregating over common time window"
    );

    let climatologies = loaded
        .par_iter()
        .map(|(source, field)| {
            let restricted = restrict_to_window(field, &window)?;
            let climatology = monthly_climatology(&restricted)?;
            Ok((*source, restricted.leading.len(), climatology))
        })
        .collect::<Result<Vec<_>>>()?;

    std::fs::create_dir_all(&config.output_dir)
        .map_err(|e| ClimateError::persist(&config.output_dir, e.to_string()))?;

    let mut staged = OutputSet::new();
    let mut outputs = Vec::with_capacity(climatologies.len());
    for (source, samples, climatology) in &climatologies {
        let path = config.output_path(source);
        staged.stage_field(climatology, &path)?;
        outputs.push(AggregateOutput {
            source: source.name.clone(),
            path,
            window,
            samples: *samples,
        });
    }
    staged.commit()?;

    for output in &outputs {
        info!(
            source = %output.source,
            path = %output.path.display(),
            samples = output.samples,
            "Wrote monthly climatology"
        );
    }

    Ok(outputs)
}

/// The sources' common window, narrowed to `pinned` when given.
pub fn resolve_window(fields: &[&GriddedField], pinned: Option<&TimeRange>) -> Result<TimeRange> {
    let common = common_time_window(fields)?;
    let Some(pinned) = pinned else {
        return Ok(common);
    };

    common.intersect(pinned).ok_or(ClimateError::EmptyWindow {
        start: common.start.max(pinned.start),
        end: common.end.min(pinned.end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use test_utils::{canonical_grid, constant_timeseries, monthly_timestamps};

    #[test]
    fn test_resolve_window_pinned() {
        let grid = canonical_grid(1, 1, 0.0, 0.0);
        let a = constant_timeseries(&grid, monthly_timestamps(2000, 1, 60), "t2m", 1.0);
        let b = constant_timeseries(&grid, monthly_timestamps(2001, 1, 60), "tmp", 1.0);

        let pinned = TimeRange::new(
            Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2002, 6, 1, 0, 0, 0).unwrap(),
        );
        let window = resolve_window(&[&a, &b], Some(&pinned)).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
        assert_eq!(window.end, pinned.end);

        let disjoint = TimeRange::new(
            Utc.with_ymd_and_hms(1990, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(1995, 1, 1, 0, 0, 0).unwrap(),
        );
        assert!(matches!(
            resolve_window(&[&a, &b], Some(&disjoint)),
            Err(ClimateError::EmptyWindow { .. })
        ));
    }
}
