//! Binned frequency tables.

use climate_common::{ClimateError, GriddedField, Result};
use serde::{Deserialize, Deserializer, Serialize};

/// `num` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Counts (or densities) of values per bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyTable {
    /// Bin edges, one more than the number of bins.
    pub edges: Vec<f64>,
    /// Raw count per bin.
    pub counts: Vec<u64>,
    /// Count per bin, or density when `density` is set.
    ///
    /// Undefined densities serialize as JSON `null`.
    #[serde(deserialize_with = "null_as_nan")]
    pub values: Vec<f64>,
    pub density: bool,
    /// Number of defined values that fell inside the edges.
    pub total: u64,
}

impl FrequencyTable {
    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }

    /// Bin widths, for integrating a density.
    pub fn widths(&self) -> Vec<f64> {
        self.edges.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

fn null_as_nan<'de, D>(deserializer: D) -> std::result::Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

/// Bin `values` by `edges`, ignoring undefined values and values outside
/// the edges.
///
/// Bins are half-open `[lo, hi)` except the last, which also includes its
/// upper edge. With `density` each bin holds `count / (total * width)`, so
/// the table integrates to 1; with nothing to count every density is NaN.
pub fn histogram_values<I>(values: I, edges: &[f64], density: bool) -> Result<FrequencyTable>
where
    I: IntoIterator<Item = f32>,
{
    check_edges(edges)?;

    let nbins = edges.len() - 1;
    let (first, last) = (edges[0], edges[nbins]);
    let mut counts = vec![0u64; nbins];

    for value in values {
        let v = value as f64;
        if value.is_nan() || v < first || v > last {
            continue;
        }
        let bin = if v == last {
            nbins - 1
        } else {
            edges.partition_point(|&e| e <= v) - 1
        };
        counts[bin] += 1;
    }

    let total: u64 = counts.iter().sum();
    let values = if density {
        counts
            .iter()
            .zip(edges.windows(2))
            .map(|(&c, w)| {
                if total == 0 {
                    f64::NAN
                } else {
                    c as f64 / (total as f64 * (w[1] - w[0]))
                }
            })
            .collect()
    } else {
        counts.iter().map(|&c| c as f64).collect()
    };

    Ok(FrequencyTable {
        edges: edges.to_vec(),
        counts,
        values,
        density,
        total,
    })
}

/// Histogram of every defined cell of `variable`.
pub fn histogram(
    field: &GriddedField,
    variable: &str,
    edges: &[f64],
    density: bool,
) -> Result<FrequencyTable> {
    let var = field.variable(variable)?;
    histogram_values(var.data.iter().copied(), edges, density)
}

fn check_edges(edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(ClimateError::invalid_field(format!(
            "histogram needs at least two edges, got {}",
            edges.len()
        )));
    }
    if edges.iter().any(|e| !e.is_finite()) || edges.windows(2).any(|w| w[0] >= w[1]) {
        return Err(ClimateError::invalid_field(
            "histogram edges must be finite and strictly increasing",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{assert_approx_eq, canonical_grid, climatology_from_fn};

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(0.0, 1.0, 5), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(linspace(2.0, 3.0, 1), vec![2.0]);
        assert!(linspace(2.0, 3.0, 0).is_empty());

        let bins = linspace(-10.0, 10.0, 40);
        assert_eq!(bins.len(), 40);
        assert_eq!(bins[0], -10.0);
        assert_eq!(bins[39], 10.0);
    }

    #[test]
    fn test_histogram_counts_and_edges() {
        let edges = [0.0, 1.0, 2.0, 3.0];
        let table = histogram_values(
            vec![0.0, 0.5, 1.0, 2.5, 3.0, -0.1, 3.1, f32::NAN],
            &edges,
            false,
        )
        .unwrap();

        // 3.0 lands in the closed last bin; out-of-range and NaN are dropped
        assert_eq!(table.counts, vec![2, 1, 2]);
        assert_eq!(table.total, 5);
        assert_eq!(table.values, vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_histogram_density_integrates_to_one() {
        let edges = linspace(-15.0, 15.0, 30);
        let values: Vec<f32> = (0..200).map(|i| (i as f32 * 0.37) % 30.0 - 15.0).collect();
        let table = histogram_values(values, &edges, true).unwrap();

        let integral: f64 = table.values.iter().zip(table.widths()).map(|(d, w)| d * w).sum();
        assert_approx_eq!(integral, 1.0, 1e-9);
    }

    #[test]
    fn test_histogram_all_undefined() {
        let edges = [0.0, 1.0, 2.0];
        let table = histogram_values(vec![f32::NAN; 4], &edges, true).unwrap();
        assert_eq!(table.total, 0);
        assert!(table.values.iter().all(|v| v.is_nan()));

        let counts = histogram_values(vec![f32::NAN; 4], &edges, false).unwrap();
        assert_eq!(counts.values, vec![0.0, 0.0]);

        // NaN densities survive a JSON round trip as null
        let json = serde_json::to_string(&table).unwrap();
        assert!(json.contains("null"));
        let back: FrequencyTable = serde_json::from_str(&json).unwrap();
        assert!(back.values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_histogram_rejects_bad_edges() {
        assert!(histogram_values(vec![1.0], &[1.0], false).is_err());
        assert!(histogram_values(vec![1.0], &[0.0, 2.0, 1.0], false).is_err());
        assert!(histogram_values(vec![1.0], &[0.0, f64::NAN], false).is_err());
    }

    #[test]
    fn test_histogram_of_field() {
        let grid = canonical_grid(2, 2, 0.0, 0.0);
        let field = climatology_from_fn(&grid, "diff", None, |m, _, _| if m <= 6 { -1.5 } else { f32::NAN });

        let table = histogram(&field, "diff", &[-2.0, -1.0, 0.0], false).unwrap();
        assert_eq!(table.counts, vec![24, 0]);
        assert_eq!(table.bin_count(), 2);
    }
}
