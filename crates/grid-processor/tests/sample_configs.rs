//! The configs shipped under `config/` must stay loadable.

use grid_processor::{AggregatorConfig, CoastalBoundary, ComparatorConfig, UnitTransform};
use test_utils::workspace_root;

#[test]
fn test_sample_aggregate_config() {
    let config = AggregatorConfig::from_file(&workspace_root().join("config/aggregate.yaml")).unwrap();

    assert_eq!(config.sources.len(), 2);
    assert_eq!(config.sources[0].name, "era5");
    assert_eq!(config.sources[0].convention.lat, "latitude");
    assert_eq!(config.sources[1].convention.lon, "lon");
    assert!(config.time_window.is_none());
}

#[test]
fn test_sample_compare_config() {
    let config = ComparatorConfig::from_file(&workspace_root().join("config/compare.yaml")).unwrap();

    assert_eq!(config.field_a.unit_transform, Some(UnitTransform::KelvinToCelsius));
    assert!(config.field_b.unit_transform.is_none());
    assert_eq!(config.land_sea_mask.variable, "lsm");
    assert_eq!(config.land_sea_mask.convention.lat, "latitude");
    assert_eq!(config.coastal_boundary, CoastalBoundary::OneSided);
    assert_eq!(config.histogram.partition.edges().len(), 40);
    assert!(config.report_path.unwrap().ends_with("bias_report.json"));
}
