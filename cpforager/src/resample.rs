//! Aggregation of a fine-resolution table onto a coarser row subset, and
//! position interpolation at arbitrary timestamps.

use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use chrono::NaiveDateTime;
use ndarray::Array1;
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::stats::{nan_max, nan_mean, nan_min, nan_sum};
use crate::table::Table;
use crate::{round_to, ForagerError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Mean,
    Min,
    Max,
    /// Number of distinct strictly positive values.
    #[serde(rename = "len_unique_pos")]
    CountUniquePositive,
}

impl Aggregation {
    pub fn name(self) -> &'static str {
        match self {
            Aggregation::Sum => "sum",
            Aggregation::Mean => "mean",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::CountUniquePositive => "len_unique_pos",
        }
    }

    /// Reduce a non-empty bucket. NaN values are skipped.
    pub fn apply(self, values: &[f64]) -> f64 {
        match self {
            Aggregation::Sum => nan_sum(values),
            Aggregation::Mean => nan_mean(values).unwrap_or(f64::NAN),
            Aggregation::Min => nan_min(values).unwrap_or(f64::NAN),
            Aggregation::Max => nan_max(values).unwrap_or(f64::NAN),
            Aggregation::CountUniquePositive => values
                .iter()
                .filter(|&&v| v > 0.0)
                .map(|&v| OrderedFloat(v))
                .collect::<HashSet<_>>()
                .len() as f64,
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Aggregation {
    type Err = ForagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" => Ok(Aggregation::Sum),
            "mean" => Ok(Aggregation::Mean),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "len_unique_pos" => Ok(Aggregation::CountUniquePositive),
            other => Err(ForagerError::UnknownAggregation(other.to_string())),
        }
    }
}

/// Index of the first timestamp strictly after `probe`.
fn search_right(haystack: &[NaiveDateTime], probe: NaiveDateTime) -> usize {
    haystack.partition_point(|t| *t <= probe)
}

/// Reference row index and fine-row range of every bucket.
fn bucket_ranges(timestamps: &[NaiveDateTime], reference_rows: &[usize]) -> Vec<(usize, Range<usize>)> {
    reference_rows
        .par_iter()
        .enumerate()
        .map(|(k, &row)| {
            let start = match k {
                0 => 0,
                _ => search_right(timestamps, timestamps[reference_rows[k - 1]]),
            };
            let end = search_right(timestamps, timestamps[row]);
            (row, start..end.max(start))
        })
        .collect()
}

/// Append one `<column>_<function>` column per requested aggregation.
///
/// Each row selected by `reference_mask` receives the aggregate of the fine
/// rows after the previous reference timestamp up to and including its own
/// timestamp. Other rows, and reference rows whose bucket is empty, hold NaN.
/// When the mask selects every row the new columns are copies of the source.
pub fn aggregate_between_samples(
    table: &Table,
    reference_mask: &[bool],
    aggregations: &[(String, Aggregation)],
) -> Result<Table, ForagerError> {
    if table.is_empty() {
        return Err(ForagerError::EmptyInput);
    }
    if reference_mask.len() != table.len() {
        return Err(ForagerError::LengthMismatch {
            column: "reference_mask".into(),
            expected: table.len(),
            actual: reference_mask.len(),
        });
    }
    let reference_rows: Vec<usize> = (0..table.len()).filter(|&i| reference_mask[i]).collect();
    if reference_rows.is_empty() {
        return Err(ForagerError::EmptyResolution);
    }
    for (column, _) in aggregations {
        table.require(column)?;
    }

    let mut out = table.clone();
    if reference_rows.len() == table.len() {
        for (column, aggregation) in aggregations {
            let source = table.require(column)?.clone();
            out.push_column(format!("{column}_{aggregation}"), source)?;
        }
        return Ok(out);
    }

    let buckets = bucket_ranges(table.timestamps(), &reference_rows);
    debug!(
        rows = table.len(),
        buckets = buckets.len(),
        empty = buckets.iter().filter(|(_, r)| r.is_empty()).count(),
        "aggregating between samples"
    );

    for (column, aggregation) in aggregations {
        let source = table.require(column)?;
        let fine = source.to_vec();
        let values: Vec<(usize, f64)> = buckets
            .par_iter()
            .map(|(row, range)| {
                let value = if range.is_empty() {
                    f64::NAN
                } else {
                    aggregation.apply(&fine[range.clone()])
                };
                (*row, value)
            })
            .collect();

        let mut aggregated = Array1::from_elem(table.len(), f64::NAN);
        for (row, value) in values {
            aggregated[row] = value;
        }
        out.push_column(format!("{column}_{aggregation}"), aggregated)?;
    }
    Ok(out)
}

/// Positions interpolated at target timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct InterpolatedPositions {
    pub longitude: Vec<f64>,
    pub latitude: Vec<f64>,
    /// Seconds to the closest fix, when requested.
    pub proxy: Option<Vec<f64>>,
}

fn linear(xp: &[f64], fp: &[f64], x: f64) -> f64 {
    let j = xp.partition_point(|v| *v <= x);
    if j == 0 {
        return fp[0];
    }
    if j == xp.len() {
        return fp[xp.len() - 1];
    }
    let i = j - 1;
    let w = (x - xp[i]) / (xp[j] - xp[i]);
    fp[i] + w * (fp[j] - fp[i])
}

/// Linear interpolation of a fix sequence at `targets`, clamped at both ends.
///
/// Positions are rounded to 6 decimals and the proxy to 0.1 s.
pub fn interpolate_positions(
    times: &[NaiveDateTime],
    lon: &[f64],
    lat: &[f64],
    targets: &[NaiveDateTime],
    with_proxy: bool,
) -> Result<InterpolatedPositions, ForagerError> {
    let Some(&t0) = times.first() else {
        return Err(ForagerError::EmptyInput);
    };
    for (name, len) in [("longitude", lon.len()), ("latitude", lat.len())] {
        if len != times.len() {
            return Err(ForagerError::LengthMismatch {
                column: name.into(),
                expected: times.len(),
                actual: len,
            });
        }
    }

    let seconds = |t: &NaiveDateTime| (*t - t0).num_milliseconds() as f64 / 1000.0;
    let xp: Vec<f64> = times.iter().map(seconds).collect();
    let xs: Vec<f64> = targets.iter().map(seconds).collect();

    let longitude = xs.iter().map(|&x| round_to(linear(&xp, lon, x), 6)).collect();
    let latitude = xs.iter().map(|&x| round_to(linear(&xp, lat, x), 6)).collect();
    let proxy = with_proxy.then(|| {
        xs.iter()
            .map(|&x| {
                let idx = xp.partition_point(|v| *v < x);
                let gap = if idx == 0 {
                    xp[0] - x
                } else if idx == xp.len() {
                    x - xp[idx - 1]
                } else {
                    (x - xp[idx - 1]).min(xp[idx] - x)
                };
                round_to(gap, 1)
            })
            .collect()
    });

    Ok(InterpolatedPositions {
        longitude,
        latitude,
        proxy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn at(seconds: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2016, 9, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::seconds(seconds)
    }

    fn fine_table(n: usize) -> Table {
        Table::new((0..n as i64).map(at).collect())
            .with_column("x", (0..n).map(|i| i as f64).collect::<Vec<_>>())
            .unwrap()
    }

    fn sum_of(column: &str) -> Vec<(String, Aggregation)> {
        vec![(column.to_string(), Aggregation::Sum)]
    }

    #[test]
    fn test_every_tenth_row_conserves_sum() {
        let table = fine_table(100);
        let mask: Vec<bool> = (0..100).map(|i| i % 10 == 9).collect();
        let out = aggregate_between_samples(&table, &mask, &sum_of("x")).unwrap();
        let agg = out.column("x_sum").unwrap();
        let filled: Vec<f64> = agg.iter().copied().filter(|v| !v.is_nan()).collect();
        assert_eq!(filled.len(), 10);
        assert_eq!(filled.iter().sum::<f64>(), (0..100).sum::<i32>() as f64);
        // first bucket covers rows 0..=9
        assert_eq!(agg[9], 45.0);
        assert!(agg[0].is_nan());
    }

    #[test]
    fn test_all_rows_selected_is_identity() {
        let table = fine_table(5)
            .with_column("y", vec![1.0, f64::NAN, 3.0, 0.0, 2.0])
            .unwrap();
        let aggregations = vec![
            ("y".to_string(), Aggregation::Mean),
            ("y".to_string(), Aggregation::CountUniquePositive),
        ];
        let out = aggregate_between_samples(&table, &[true; 5], &aggregations).unwrap();
        for name in ["y_mean", "y_len_unique_pos"] {
            let col = out.column(name).unwrap();
            assert_eq!(col[0], 1.0);
            assert!(col[1].is_nan());
            assert_eq!(col[4], 2.0);
        }
    }

    #[test]
    fn test_several_functions_per_column() {
        let table = fine_table(6)
            .with_column("v", vec![f64::NAN, 4.0, 1.0, 2.0, 2.0, 0.0])
            .unwrap();
        let mask = [false, false, true, false, false, true];
        let aggregations: Vec<(String, Aggregation)> = ["sum", "mean", "min", "max", "len_unique_pos"]
            .iter()
            .map(|f| ("v".to_string(), f.parse().unwrap()))
            .collect();
        let out = aggregate_between_samples(&table, &mask, &aggregations).unwrap();
        assert_eq!(out.column("v_sum").unwrap()[2], 5.0);
        assert_eq!(out.column("v_mean").unwrap()[2], 2.5);
        assert_eq!(out.column("v_min").unwrap()[5], 0.0);
        assert_eq!(out.column("v_max").unwrap()[5], 2.0);
        assert_eq!(out.column("v_len_unique_pos").unwrap()[5], 1.0);
        assert_eq!(out.column("v_len_unique_pos").unwrap()[2], 2.0);
        assert!(out.column("v_sum").unwrap()[3].is_nan());
    }

    #[test]
    fn test_duplicate_reference_timestamp_leaves_empty_bucket() {
        let times = vec![at(0), at(1), at(1), at(2)];
        let table = Table::new(times).with_column("x", vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let mask = [false, true, true, false];
        let out = aggregate_between_samples(&table, &mask, &sum_of("x")).unwrap();
        let agg = out.column("x_sum").unwrap();
        assert_eq!(agg[1], 6.0);
        assert!(agg[2].is_nan());
    }

    #[test]
    fn test_all_nan_bucket() {
        let table = Table::new(vec![at(0), at(1), at(2)])
            .with_column("x", vec![f64::NAN, f64::NAN, 1.0])
            .unwrap();
        let aggregations = vec![
            ("x".to_string(), Aggregation::Sum),
            ("x".to_string(), Aggregation::Max),
        ];
        let out = aggregate_between_samples(&table, &[false, true, true], &aggregations).unwrap();
        assert_eq!(out.column("x_sum").unwrap()[1], 0.0);
        assert!(out.column("x_max").unwrap()[1].is_nan());
        assert_eq!(out.column("x_max").unwrap()[2], 1.0);
    }

    #[test]
    fn test_degenerate_inputs_are_errors() {
        let table = fine_table(3);
        assert!(matches!(
            aggregate_between_samples(&Table::default(), &[], &sum_of("x")),
            Err(ForagerError::EmptyInput)
        ));
        assert!(matches!(
            aggregate_between_samples(&table, &[true], &sum_of("x")),
            Err(ForagerError::LengthMismatch { .. })
        ));
        assert!(matches!(
            aggregate_between_samples(&table, &[false; 3], &sum_of("x")),
            Err(ForagerError::EmptyResolution)
        ));
        assert!(matches!(
            aggregate_between_samples(&table, &[true, false, true], &sum_of("nope")),
            Err(ForagerError::UnknownColumn(_))
        ));
        assert!(matches!(
            "median".parse::<Aggregation>(),
            Err(ForagerError::UnknownAggregation(_))
        ));
    }

    #[test]
    fn test_interpolate_positions() {
        let times = [at(0), at(10), at(20)];
        let lon = [0.0, 1.0, 1.0];
        let lat = [0.0, 0.0, 2.0];
        let targets = [at(-5), at(4), at(15), at(30)];
        let out = interpolate_positions(&times, &lon, &lat, &targets, true).unwrap();
        assert_eq!(out.longitude, vec![0.0, 0.4, 1.0, 1.0]);
        assert_eq!(out.latitude, vec![0.0, 0.0, 1.0, 2.0]);
        assert_eq!(out.proxy, Some(vec![5.0, 4.0, 5.0, 10.0]));

        let out = interpolate_positions(&times, &lon, &lat, &targets, false).unwrap();
        assert!(out.proxy.is_none());
        assert!(matches!(
            interpolate_positions(&[], &[], &[], &targets, false),
            Err(ForagerError::EmptyInput)
        ));
    }

    proptest! {
        #[test]
        fn prop_sum_is_conserved_up_to_last_reference(
            values in proptest::collection::vec(-100.0f64..100.0, 1..80),
            picks in proptest::collection::vec(any::<bool>(), 80),
        ) {
            let n = values.len();
            let mut mask: Vec<bool> = picks[..n].to_vec();
            mask[n - 1] = true;
            let table = Table::new((0..n as i64).map(at).collect())
                .with_column("x", values.clone())
                .unwrap();
            let out = aggregate_between_samples(&table, &mask, &sum_of("x")).unwrap();
            let agg = out.column("x_sum").unwrap();
            let total: f64 = agg.iter().filter(|v| !v.is_nan()).sum();
            let expected: f64 = values.iter().sum();
            prop_assert!((total - expected).abs() < 1e-6);
            for i in 0..n {
                prop_assert_eq!(agg[i].is_nan(), !mask[i]);
            }
        }
    }
}
