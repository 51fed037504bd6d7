//! Pointwise unit conversion.

use climate_common::{ClimateError, GriddedField, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Kelvin offset of the Celsius scale.
pub const KELVIN_OFFSET: f64 = 273.15;

/// Spellings of Kelvin found in CF files.
const KELVIN_UNITS: &[&str] = &["K", "k", "kelvin", "Kelvin", "degK", "degrees_K"];

/// A pointwise transform applied to one variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitTransform {
    /// Subtract 273.15; the variable must be in Kelvin when it declares units.
    KelvinToCelsius,
    /// Add a constant.
    Offset { value: f64 },
    /// Multiply by a constant.
    Scale { factor: f64 },
    /// `value * scale + offset`.
    Affine { scale: f64, offset: f64 },
}

impl UnitTransform {
    /// Apply to a single value. Undefined stays undefined.
    pub fn apply(&self, value: f32) -> f32 {
        if value.is_nan() {
            return value;
        }
        let v = value as f64;
        let out = match *self {
            Self::KelvinToCelsius => v - KELVIN_OFFSET,
            Self::Offset { value } => v + value,
            Self::Scale { factor } => v * factor,
            Self::Affine { scale, offset } => v * scale + offset,
        };
        out as f32
    }

    /// Units label after the transform, if the transform fixes one.
    pub fn target_units(&self) -> Option<&'static str> {
        match self {
            Self::KelvinToCelsius => Some("degrees Celsius"),
            _ => None,
        }
    }

    fn check_source_units(&self, variable: &str, units: Option<&str>) -> Result<()> {
        match (self, units) {
            (Self::KelvinToCelsius, Some(units)) if !KELVIN_UNITS.contains(&units) => {
                Err(ClimateError::UnitConversion(format!(
                    "variable '{}' is in '{}', expected Kelvin",
                    variable, units
                )))
            }
            _ => Ok(()),
        }
    }

    fn check_parameters(&self) -> Result<()> {
        let finite = match *self {
            Self::KelvinToCelsius => true,
            Self::Offset { value } => value.is_finite(),
            Self::Scale { factor } => factor.is_finite(),
            Self::Affine { scale, offset } => scale.is_finite() && offset.is_finite(),
        };
        if finite {
            Ok(())
        } else {
            Err(ClimateError::UnitConversion(format!(
                "transform {:?} has non-finite parameters",
                self
            )))
        }
    }
}

/// Apply `transform` to `variable`, leaving coordinates and other variables
/// unchanged.
///
/// Fails with `UnitConversion` if the variable is missing or declares units
/// the transform does not accept.
pub fn convert_units(
    field: &GriddedField,
    variable: &str,
    transform: &UnitTransform,
) -> Result<GriddedField> {
    transform.check_parameters()?;

    let source = field.variable(variable).map_err(|_| {
        ClimateError::UnitConversion(format!("variable '{}' not present in field", variable))
    })?;
    transform.check_source_units(variable, source.units.as_deref())?;

    let mut converted = source.with_data(source.data.mapv(|v| transform.apply(v)));
    if let Some(units) = transform.target_units() {
        converted.units = Some(units.to_string());
    }

    debug!(variable, ?transform, "Converted units");

    let mut out = field.clone();
    out.insert_variable(variable, converted)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, assert_undefined, canonical_grid, constant_climatology};

    #[test]
    fn test_kelvin_to_celsius() {
        let grid = canonical_grid(2, 2, 0.0, 0.0);
        let field = constant_climatology(&grid, "t2m", 283.15, Some("K"));

        let out = convert_units(&field, "t2m", &UnitTransform::KelvinToCelsius).unwrap();
        let t2m = out.variable("t2m").unwrap();
        assert!(t2m.data.iter().all(|&v| (v - 10.0).abs() < 1e-4));
        assert_eq!(t2m.units.as_deref(), Some("degrees Celsius"));
        assert_eq!(out.grid, field.grid);
        assert_eq!(out.leading, field.leading);
    }

    #[test]
    fn test_convert_missing_variable() {
        let grid = canonical_grid(1, 1, 0.0, 0.0);
        let field = constant_climatology(&grid, "t2m", 1.0, None);
        assert!(matches!(
            convert_units(&field, "tmp", &UnitTransform::KelvinToCelsius),
            Err(ClimateError::UnitConversion(_))
        ));
    }

    #[test]
    fn test_convert_rejects_wrong_units() {
        let grid = canonical_grid(1, 1, 0.0, 0.0);
        let field = constant_climatology(&grid, "tmp", 12.0, Some("degrees Celsius"));
        assert!(matches!(
            convert_units(&field, "tmp", &UnitTransform::KelvinToCelsius),
            Err(ClimateError::UnitConversion(_))
        ));
    }

    #[test]
    fn test_unitless_variable_accepted() {
        let grid = canonical_grid(1, 1, 0.0, 0.0);
        let field = constant_climatology(&grid, "t2m", 273.15, None);
        let out = convert_units(&field, "t2m", &UnitTransform::KelvinToCelsius).unwrap();
        assert_approx_eq!(out.variable("t2m").unwrap().data[[0, 0, 0]], 0.0, 1e-4);
    }

    #[test]
    fn test_affine_and_nan() {
        let t = UnitTransform::Affine { scale: 2.0, offset: 1.0 };
        assert_eq!(t.apply(3.0), 7.0);
        assert_undefined!(t.apply(f32::NAN));
        assert_eq!(UnitTransform::Offset { value: -1.5 }.apply(1.0), -0.5);
        assert_eq!(UnitTransform::Scale { factor: 0.5 }.apply(3.0), 1.5);
    }

    #[test]
    fn test_non_finite_parameters_rejected() {
        let grid = canonical_grid(1, 1, 0.0, 0.0);
        let field = constant_climatology(&grid, "t2m", 1.0, None);
        let t = UnitTransform::Scale { factor: f64::INFINITY };
        assert!(matches!(convert_units(&field, "t2m", &t), Err(ClimateError::UnitConversion(_))));
    }

    #[test]
    fn test_transform_from_yaml() {
        let t: UnitTransform = serde_yaml::from_str("kind: kelvin_to_celsius").unwrap();
        assert_eq!(t, UnitTransform::KelvinToCelsius);
        let t: UnitTransform = serde_yaml::from_str("kind: offset\nvalue: -273.15").unwrap();
        assert_eq!(t, UnitTransform::Offset { value: -273.15 });
    }
}
