//! End-to-end runs of both pipeline stages on synthetic netCDF files.

use std::path::Path;

use climate_common::{AxisNames, ClimateError, CoordinateConvention, SourceSpec, SpatialGrid};
use grid_processor::pipeline::{aggregate, compare};
use grid_processor::{
    area_weighted_mean_all, difference, monthly_climatology, AggregatorConfig, BiasReport,
    ClimatologyInput, ComparatorConfig, MaskInput, UnitTransform, DIFFERENCE_VARIABLE,
};
use netcdf_parser::{load_climatology, persist, read_field};
use test_utils::{
    assert_approx_eq, canonical_grid, constant_timeseries, land_fraction_field, monthly_timestamps,
    regular_grid, temp_test_dir, timeseries_from_fn,
};

fn era5_grid() -> SpatialGrid {
    // Descending latitude and 0..360 longitude: [1, 0] x [0, 359]
    regular_grid(2, 2, 1.0, -1.0, 0.0, 359.0)
}

fn cru_grid() -> SpatialGrid {
    // The same cells in canonical form: [0, 1] x [-1, 0]
    canonical_grid(2, 2, 0.0, -1.0)
}

fn write_era5_year(dir: &Path, year: i32, kelvin: f32) {
    let field = timeseries_from_fn(
        &era5_grid(),
        monthly_timestamps(year, 1, 12),
        AxisNames::new("time", "latitude", "longitude"),
        "t2m",
        Some("K"),
        |_, _, _| kelvin,
    );
    persist(&field, &dir.join(format!("era5_t2m_{}.nc", year))).unwrap();
}

fn write_cru_years(dir: &Path, start_year: i32, years: usize, celsius: f32) {
    let field = constant_timeseries(&cru_grid(), monthly_timestamps(start_year, 1, 12 * years), "tmp", celsius);
    persist(&field, &dir.join("cru_ts4.04.tmp.dat.nc")).unwrap();
}

fn write_mask(path: &Path) {
    let mut mask = land_fraction_field(&era5_grid(), "lsm", &[1.0, 1.0, 1.0, 1.0]);
    mask.names = AxisNames::new("time", "latitude", "longitude");
    persist(&mask, path).unwrap();
}

fn source(name: &str, dir: &Path, pattern: &str, variable: &str, convention: CoordinateConvention) -> SourceSpec {
    SourceSpec {
        name: name.to_string(),
        directory: dir.to_path_buf(),
        pattern: pattern.to_string(),
        variables: vec![variable.to_string()],
        convention,
    }
}

#[test]
fn test_aggregate_then_compare() {
    let root = temp_test_dir();
    let era5_dir = root.path().join("era5");
    let cru_dir = root.path().join("cru");
    let out_dir = root.path().join("data");
    std::fs::create_dir_all(&era5_dir).unwrap();
    std::fs::create_dir_all(&cru_dir).unwrap();

    // ERA5 covers 2000-2001, CRU-TS 2001-2002: the common window is 2001
    write_era5_year(&era5_dir, 2000, 300.0);
    write_era5_year(&era5_dir, 2001, 283.15);
    write_cru_years(&cru_dir, 2001, 2, 12.0);

    let agg = AggregatorConfig {
        sources: vec![
            source("era5", &era5_dir, "era5_t2m_*.nc", "t2m", CoordinateConvention::era5()),
            source("cruts", &cru_dir, "cru_ts4.04.*.nc", "tmp", CoordinateConvention::default()),
        ],
        output_dir: out_dir.clone(),
        time_window: None,
    };
    let outputs = aggregate(&agg).unwrap();
    assert_eq!(outputs.len(), 2);
    assert!(outputs.iter().all(|o| o.samples == 12));
    assert_eq!(outputs[0].path, out_dir.join("era5_mavg.nc"));

    // The ERA5 climatology is stored canonically and only sees 2001
    let era5 = load_climatology(&out_dir.join("era5_mavg.nc"), &["t2m".to_string()]).unwrap();
    assert_eq!(era5.grid, cru_grid());
    assert_eq!(era5.names, AxisNames::monthly());
    assert!(era5.variable("t2m").unwrap().data.iter().all(|&v| (v - 283.15).abs() < 1e-3));

    let mask_path = root.path().join("era5_invariant_lsm.nc");
    write_mask(&mask_path);

    let report_path = root.path().join("bias.json");
    let cmp = ComparatorConfig {
        field_a: ClimatologyInput {
            name: "era5".to_string(),
            path: out_dir.join("era5_mavg.nc"),
            variable: "t2m".to_string(),
            unit_transform: Some(UnitTransform::KelvinToCelsius),
        },
        field_b: ClimatologyInput {
            name: "cruts".to_string(),
            path: out_dir.join("cruts_mavg.nc"),
            variable: "tmp".to_string(),
            unit_transform: None,
        },
        land_sea_mask: MaskInput {
            path: mask_path,
            variable: "lsm".to_string(),
            convention: CoordinateConvention::era5(),
            land_threshold: 0.0,
        },
        hot_threshold: -1.0,
        histogram: Default::default(),
        coastal_boundary: Default::default(),
        grid_tolerance: 1e-6,
        report_path: Some(report_path.clone()),
        output_dir: Some(root.path().join("analysis")),
    };

    let comparison = compare(&cmp).unwrap();
    assert_approx_eq!(comparison.report.overall.all.unwrap(), -2.0, 1e-4);
    assert_eq!(comparison.report.cells.land, 4);
    assert_eq!(comparison.report.cells.hot_coastal, 0);

    let written: BiasReport = serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(written.monthly.len(), 12);
    assert_eq!(written.field_a, "era5");

    let diff = load_climatology(
        &root.path().join("analysis").join("difference.nc"),
        &[DIFFERENCE_VARIABLE.to_string()],
    )
    .unwrap();
    assert_eq!(diff.shape(), (12, 2, 2));

    let summary = read_field(
        &root.path().join("analysis").join("difference_summary.nc"),
        &["diff_max".to_string(), "hot_coastal".to_string()],
        &CoordinateConvention::default(),
    )
    .unwrap();
    assert_approx_eq!(summary.variable("diff_max").unwrap().data[[0, 1, 1]], -2.0, 1e-4);
}

#[test]
fn test_aggregate_disjoint_sources_writes_nothing() {
    let root = temp_test_dir();
    let era5_dir = root.path().join("era5");
    let cru_dir = root.path().join("cru");
    let out_dir = root.path().join("data");
    std::fs::create_dir_all(&era5_dir).unwrap();
    std::fs::create_dir_all(&cru_dir).unwrap();

    write_era5_year(&era5_dir, 2000, 280.0);
    write_cru_years(&cru_dir, 2010, 1, 7.0);

    let agg = AggregatorConfig {
        sources: vec![
            source("era5", &era5_dir, "*.nc", "t2m", CoordinateConvention::era5()),
            source("cruts", &cru_dir, "*.nc", "tmp", CoordinateConvention::default()),
        ],
        output_dir: out_dir.clone(),
        time_window: None,
    };

    assert!(matches!(aggregate(&agg), Err(ClimateError::EmptyWindow { .. })));
    assert!(!out_dir.exists());
}

#[test]
fn test_aggregate_blocked_output_leaves_no_partial_set() {
    let root = temp_test_dir();
    let era5_dir = root.path().join("era5");
    let cru_dir = root.path().join("cru");
    let out_dir = root.path().join("data");
    std::fs::create_dir_all(&era5_dir).unwrap();
    std::fs::create_dir_all(&cru_dir).unwrap();
    write_era5_year(&era5_dir, 2001, 283.15);
    write_cru_years(&cru_dir, 2001, 1, 12.0);

    // A directory squats on the second source's output path
    std::fs::create_dir_all(out_dir.join("zz_mavg.nc")).unwrap();

    let agg = AggregatorConfig {
        sources: vec![
            source("aa", &era5_dir, "*.nc", "t2m", CoordinateConvention::era5()),
            source("zz", &cru_dir, "*.nc", "tmp", CoordinateConvention::default()),
        ],
        output_dir: out_dir.clone(),
        time_window: None,
    };

    match aggregate(&agg) {
        Err(ClimateError::Persist { path, .. }) => assert_eq!(path, out_dir.join("zz_mavg.nc")),
        other => panic!("expected Persist, got {other:?}"),
    }
    assert!(!out_dir.join("aa_mavg.nc").exists());
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 1);
}

#[test]
fn test_compare_blocked_report_leaves_no_partial_set() {
    let root = temp_test_dir();
    let grid = canonical_grid(2, 2, 0.0, -1.0);
    let a = monthly_climatology(&constant_timeseries(&grid, monthly_timestamps(2001, 1, 12), "t2m", 10.0)).unwrap();
    let b = monthly_climatology(&constant_timeseries(&grid, monthly_timestamps(2001, 1, 12), "tmp", 12.0)).unwrap();
    persist(&a, &root.path().join("a.nc")).unwrap();
    persist(&b, &root.path().join("b.nc")).unwrap();
    persist(&land_fraction_field(&grid, "lsm", &[1.0; 4]), &root.path().join("lsm.nc")).unwrap();

    let report_path = root.path().join("bias.json");
    std::fs::create_dir(&report_path).unwrap();
    let analysis = root.path().join("analysis");

    let cmp = ComparatorConfig {
        field_a: ClimatologyInput {
            name: "a".to_string(),
            path: root.path().join("a.nc"),
            variable: "t2m".to_string(),
            unit_transform: None,
        },
        field_b: ClimatologyInput {
            name: "b".to_string(),
            path: root.path().join("b.nc"),
            variable: "tmp".to_string(),
            unit_transform: None,
        },
        land_sea_mask: MaskInput {
            path: root.path().join("lsm.nc"),
            variable: "lsm".to_string(),
            convention: CoordinateConvention::default(),
            land_threshold: 0.0,
        },
        hot_threshold: -2.0,
        histogram: Default::default(),
        coastal_boundary: Default::default(),
        grid_tolerance: 1e-6,
        report_path: Some(report_path.clone()),
        output_dir: Some(analysis.clone()),
    };

    assert!(matches!(compare(&cmp), Err(ClimateError::Persist { .. })));
    assert!(!analysis.join("difference.nc").exists());
    assert!(!analysis.join("difference_summary.nc").exists());
    assert_eq!(std::fs::read_dir(&analysis).unwrap().count(), 0);
    assert!(report_path.is_dir());
}

#[test]
fn test_compare_mask_on_other_grid_fails() {
    let root = temp_test_dir();
    let grid = canonical_grid(2, 2, 0.0, -1.0);
    let a = monthly_climatology(&constant_timeseries(&grid, monthly_timestamps(2001, 1, 12), "t2m", 10.0)).unwrap();
    let b = monthly_climatology(&constant_timeseries(&grid, monthly_timestamps(2001, 1, 12), "tmp", 12.0)).unwrap();
    persist(&a, &root.path().join("a.nc")).unwrap();
    persist(&b, &root.path().join("b.nc")).unwrap();

    let mask = land_fraction_field(&canonical_grid(2, 2, 30.0, -1.0), "lsm", &[1.0; 4]);
    persist(&mask, &root.path().join("lsm.nc")).unwrap();

    let cmp = ComparatorConfig {
        field_a: ClimatologyInput {
            name: "a".to_string(),
            path: root.path().join("a.nc"),
            variable: "t2m".to_string(),
            unit_transform: None,
        },
        field_b: ClimatologyInput {
            name: "b".to_string(),
            path: root.path().join("b.nc"),
            variable: "tmp".to_string(),
            unit_transform: None,
        },
        land_sea_mask: MaskInput {
            path: root.path().join("lsm.nc"),
            variable: "lsm".to_string(),
            convention: CoordinateConvention::default(),
            land_threshold: 0.0,
        },
        hot_threshold: -2.0,
        histogram: Default::default(),
        coastal_boundary: Default::default(),
        grid_tolerance: 1e-6,
        report_path: Some(root.path().join("never.json")),
        output_dir: None,
    };

    assert!(matches!(compare(&cmp), Err(ClimateError::GridMismatch(_))));
    assert!(!root.path().join("never.json").exists());
}

/// Two 2x2 sources with 24 monthly samples, constant 10 and 12.
#[test]
fn test_constant_sources_give_constant_bias() {
    let grid = canonical_grid(2, 2, 0.0, 0.0);
    let a = constant_timeseries(&grid, monthly_timestamps(2000, 1, 24), "t2m", 10.0);
    let b = constant_timeseries(&grid, monthly_timestamps(2000, 1, 24), "tmp", 12.0);

    let clim_a = monthly_climatology(&a).unwrap();
    let clim_b = monthly_climatology(&b).unwrap();
    assert_eq!(clim_a.shape(), (12, 2, 2));
    assert!(clim_a.variable("t2m").unwrap().data.iter().all(|&v| v == 10.0));
    assert!(clim_b.variable("tmp").unwrap().data.iter().all(|&v| v == 12.0));

    let diff = difference(&clim_a, &clim_b, "t2m", "tmp", 1e-6).unwrap();
    assert!(diff.variable(DIFFERENCE_VARIABLE).unwrap().data.iter().all(|&v| v == -2.0));

    let mean = area_weighted_mean_all(&diff, DIFFERENCE_VARIABLE).unwrap().unwrap();
    assert_approx_eq!(mean, -2.0, 1e-12);
}
