//! Monthly climatologies plus a land-sea mask to a bias report.

use chrono::Utc;
use climate_common::{
    ClimateError, CoordinateConvention, GriddedField, LandSeaMask, LeadingAxis, Result,
    SelectionMask, Variable,
};
use ndarray::{Array2, Axis, Zip};
use netcdf_parser::{load_climatology, load_field, OutputSet};
use tracing::info;

use crate::config::{ClimatologyInput, ComparatorConfig};
use crate::histogram::histogram;
use crate::mask::{align_mask_to_field, apply_land_mask, coastal_selection, derive_coastal_mask, select};
use crate::normalize::normalize;
use crate::report::{BiasReport, CellCounts, Histograms, MonthlyBias, RegionMeans};
use crate::stats::{
    area_weighted_mean_all, difference, reduce_leading, spatial_mean_series, Reduction,
    DIFFERENCE_VARIABLE,
};
use crate::units::convert_units;

/// File name of the monthly difference written to `output_dir`.
pub const DIFFERENCE_FILE: &str = "difference.nc";

/// File name of the per-cell summaries written to `output_dir`.
pub const SUMMARY_FILE: &str = "difference_summary.nc";

/// Everything the comparator produces.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub report: BiasReport,
    /// Monthly `a - b` over land, variable [`DIFFERENCE_VARIABLE`].
    pub difference: GriddedField,
    /// Static per-cell summaries of the difference.
    pub summary: GriddedField,
}

/// Load both climatologies and the mask, compare them, and write whatever
/// outputs the config asks for. The outputs appear together or not at all.
pub fn compare(config: &ComparatorConfig) -> Result<Comparison> {
    config.validate().map_err(ClimateError::Config)?;

    let field_a = load_input(&config.field_a)?;
    let field_b = load_input(&config.field_b)?;

    let mask_input = &config.land_sea_mask;
    let raw_mask = load_field(
        &mask_input.path,
        std::slice::from_ref(&mask_input.variable),
        &mask_input.convention,
    )?;
    let mask = align_mask_to_field(&raw_mask, &field_a, &mask_input.alignment(config.grid_tolerance))?;

    let comparison = compare_fields(&field_a, &field_b, &mask, config)?;

    let mut staged = OutputSet::new();
    if let Some(dir) = &config.output_dir {
        std::fs::create_dir_all(dir).map_err(|e| ClimateError::persist(dir, e.to_string()))?;
        staged.stage_field(&comparison.difference, &dir.join(DIFFERENCE_FILE))?;
        staged.stage_field(&comparison.summary, &dir.join(SUMMARY_FILE))?;
    }
    if let Some(path) = &config.report_path {
        staged.stage_with(path, |scratch| comparison.report.write(scratch))?;
    }
    if !staged.is_empty() {
        let written = staged.commit()?;
        info!(outputs = ?written, "Wrote comparison outputs");
    }

    Ok(comparison)
}

/// Load one climatology into the canonical convention.
pub fn load_input(input: &ClimatologyInput) -> Result<GriddedField> {
    let raw = load_climatology(&input.path, std::slice::from_ref(&input.variable))?;
    let field = normalize(&raw, &CoordinateConvention::default())?;
    info!(name = %input.name, path = %input.path.display(), shape = ?field.shape(), "Loaded climatology");
    Ok(field)
}

/// Compare two canonical climatologies over the land cells of `mask`.
pub fn compare_fields(
    field_a: &GriddedField,
    field_b: &GriddedField,
    mask: &LandSeaMask,
    config: &ComparatorConfig,
) -> Result<Comparison> {
    let a = prepare(field_a, &config.field_a, mask, config.grid_tolerance)?;
    let b = prepare(field_b, &config.field_b, mask, config.grid_tolerance)?;

    let diff = difference(
        &a,
        &b,
        &config.field_a.variable,
        &config.field_b.variable,
        config.grid_tolerance,
    )?;
    let months = match &diff.leading {
        LeadingAxis::Month(months) => months.clone(),
        other => {
            return Err(ClimateError::invalid_field(format!(
                "comparison needs monthly climatologies, found a {} axis",
                other.kind()
            )))
        }
    };

    let coastal = derive_coastal_mask(mask, config.coastal_boundary)?;
    let coastal_cells = coastal_selection(&coastal, &diff, config.grid_tolerance)?;
    let inland_cells = coastal_cells.not();
    let coastal_diff = select(&diff, &coastal_cells)?;
    let inland_diff = select(&diff, &inland_cells)?;

    let diff_var = diff.variable(DIFFERENCE_VARIABLE)?;
    let hot_threshold = config.hot_threshold;
    let hot = SelectionMask::where_values(diff_var, |v| v < hot_threshold);
    let hot_any_month = any_along_leading(&hot);
    let hot_coastal = Zip::from(&hot_any_month)
        .and(&coastal.coastal)
        .fold(0, |n, &h, &c| if h && c { n + 1 } else { n });

    let all_series = spatial_mean_series(&diff, DIFFERENCE_VARIABLE)?;
    let coastal_series = spatial_mean_series(&coastal_diff, DIFFERENCE_VARIABLE)?;
    let inland_series = spatial_mean_series(&inland_diff, DIFFERENCE_VARIABLE)?;
    let monthly = months
        .iter()
        .enumerate()
        .map(|(k, &month)| MonthlyBias {
            month,
            means: RegionMeans {
                all: all_series[k],
                coastal: coastal_series[k],
                inland: inland_series[k],
            },
        })
        .collect();

    let overall = RegionMeans {
        all: area_weighted_mean_all(&diff, DIFFERENCE_VARIABLE)?,
        coastal: area_weighted_mean_all(&coastal_diff, DIFFERENCE_VARIABLE)?,
        inland: area_weighted_mean_all(&inland_diff, DIFFERENCE_VARIABLE)?,
    };

    let bins = &config.histogram;
    let partition_edges = bins.partition.edges();
    let histograms = Histograms {
        all: histogram(&diff, DIFFERENCE_VARIABLE, &bins.overall.edges(), false)?,
        coastal: histogram(&coastal_diff, DIFFERENCE_VARIABLE, &partition_edges, bins.density)?,
        inland: histogram(&inland_diff, DIFFERENCE_VARIABLE, &partition_edges, bins.density)?,
    };

    let land_coastal = Zip::from(&mask.land)
        .and(&coastal.coastal)
        .fold(0, |n, &l, &c| if l && c { n + 1 } else { n });
    let cells = CellCounts {
        total: mask.grid.len(),
        land: mask.land_count(),
        coastal: land_coastal,
        inland: mask.land_count() - land_coastal,
        hot_coastal,
    };

    let summary = summarize(&diff, &coastal_diff, &coastal.coastal, &hot_any_month)?;

    let report = BiasReport {
        generated_at: Utc::now(),
        field_a: config.field_a.name.clone(),
        field_b: config.field_b.name.clone(),
        units: diff_var.units.clone(),
        hot_threshold,
        cells,
        overall,
        monthly,
        histograms,
    };

    info!(
        field_a = %report.field_a,
        field_b = %report.field_b,
        overall = ?report.overall,
        land = cells.land,
        coastal = cells.coastal,
        hot_coastal = cells.hot_coastal,
        "Compared climatologies"
    );

    Ok(Comparison {
        report,
        difference: diff,
        summary,
    })
}

/// Unit conversion then ocean masking for one input.
fn prepare(
    field: &GriddedField,
    input: &ClimatologyInput,
    mask: &LandSeaMask,
    tolerance: f64,
) -> Result<GriddedField> {
    let converted = match &input.unit_transform {
        Some(transform) => convert_units(field, &input.variable, transform)?,
        None => field.clone(),
    };
    apply_land_mask(&converted, mask, tolerance)
}

/// Per (lat, lon) cell: selected in at least one leading step.
fn any_along_leading(selection: &SelectionMask) -> Array2<bool> {
    selection.cells.map_axis(Axis(0), |steps| steps.iter().any(|&s| s))
}

/// Static maps: extremes and mean of the difference across months, the
/// same restricted to coastal cells, and the hot-coastal indicator
/// (1 coastal, 0 inland, undefined where never hot).
fn summarize(
    diff: &GriddedField,
    coastal_diff: &GriddedField,
    coastal: &Array2<bool>,
    hot_any_month: &Array2<bool>,
) -> Result<GriddedField> {
    let reductions = [
        ("diff_max", diff, Reduction::Max),
        ("diff_min", diff, Reduction::Min),
        ("diff_mean", diff, Reduction::Mean),
        ("coastal_diff_min", coastal_diff, Reduction::Min),
        ("coastal_diff_mean", coastal_diff, Reduction::Mean),
    ];

    let mut summary = GriddedField::new(diff.names.clone(), LeadingAxis::Static, diff.grid.clone());
    for (name, source, reduction) in reductions {
        let reduced = reduce_leading(source, DIFFERENCE_VARIABLE, reduction)?;
        let variable = reduced.variable(DIFFERENCE_VARIABLE)?.clone();
        summary.insert_variable(name, variable)?;
    }

    let (nlat, nlon) = coastal.dim();
    let indicator = Zip::from(coastal)
        .and(hot_any_month)
        .map_collect(|&c, &h| match (h, c) {
            (false, _) => f32::NAN,
            (true, true) => 1.0,
            (true, false) => 0.0,
        })
        .into_shape((1, nlat, nlon))
        .map_err(|e| ClimateError::invalid_field(e.to_string()))?;
    summary.insert_variable(
        "hot_coastal",
        Variable::new(indicator).with_long_name("coastal cell with a hot month"),
    )?;

    Ok(summary)
}
