//! Reductions over labelled samples: trip and dive tables, recording infos.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::Position;

/// Median of the non-NaN values, averaging the middle pair for even counts.
pub fn median<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let mut data: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if data.is_empty() {
        return None;
    }
    data.sort_by(f64::total_cmp);
    let mid = data.len() / 2;
    if data.len() % 2 == 0 {
        Some((data[mid - 1] + data[mid]) / 2.0)
    } else {
        Some(data[mid])
    }
}

pub fn nan_sum<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> f64 {
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

pub fn nan_max<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Option<f64> {
    values
        .into_iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.max(v))))
}

pub fn nan_min<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Option<f64> {
    values
        .into_iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| Some(acc.map_or(v, |m: f64| m.min(v))))
}

pub fn nan_mean<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0f64, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Contiguous `[start, end]` index ranges for every positive label, in id order.
///
/// Labels are expected to form contiguous runs, as produced by trip and dive
/// segmentation.
pub fn label_ranges(labels: &[u32]) -> Vec<(u32, usize, usize)> {
    let mut ranges: Vec<(u32, usize, usize)> = Vec::new();
    for (i, &label) in labels.iter().enumerate() {
        if label == 0 {
            continue;
        }
        match ranges.last_mut() {
            Some((id, _, end)) if *id == label && *end + 1 == i => *end = i,
            _ => ranges.push((label, i, i)),
        }
    }
    ranges.sort_by_key(|(id, start, _)| (*id, *start));
    ranges
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TripStatistics {
    pub id: u32,
    /// km
    pub length: f64,
    /// hours
    pub duration: f64,
    /// largest step time inside the trip, seconds
    pub max_hole: f64,
    /// farthest distance to the nest, km
    pub dmax: f64,
    pub n_step: usize,
}

/// One row per trip, ascending id. No trip gives an empty table.
pub fn trip_statistics(
    trip: &[u32],
    times: &[NaiveDateTime],
    step_time: &[f64],
    step_length: &[f64],
    dist_to_nest: &[f64],
) -> Vec<TripStatistics> {
    label_ranges(trip)
        .into_iter()
        .map(|(id, start, end)| {
            let range = start..=end;
            TripStatistics {
                id,
                length: nan_sum(&step_length[range.clone()]),
                duration: (times[end] - times[start]).num_milliseconds() as f64 / 3.6e6,
                max_hole: nan_max(&step_time[range.clone()]).unwrap_or(f64::NAN),
                dmax: nan_max(&dist_to_nest[range]).unwrap_or(f64::NAN),
                n_step: end - start + 1,
            }
        })
        .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DiveStatistics {
    pub id: u32,
    /// seconds
    pub duration: f64,
    /// meters
    pub max_depth: f64,
    pub n_step: usize,
}

pub fn dive_statistics(dive: &[u32], times: &[NaiveDateTime], depth: &[f64]) -> Vec<DiveStatistics> {
    label_ranges(dive)
        .into_iter()
        .map(|(id, start, end)| DiveStatistics {
            id,
            duration: (times[end] - times[start]).num_milliseconds() as f64 / 1000.0,
            max_depth: nan_max(&depth[start..=end]).unwrap_or(f64::NAN),
            n_step: end - start + 1,
        })
        .collect()
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BasicInfos {
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    /// median step time, seconds
    pub resolution: f64,
    /// days
    pub total_duration: f64,
    pub n_df: usize,
}

/// Returns `None` for an empty recording.
pub fn basic_infos(times: &[NaiveDateTime], step_time: &[f64]) -> Option<BasicInfos> {
    let start = *times.iter().min()?;
    let end = *times.iter().max()?;
    Some(BasicInfos {
        start_datetime: start,
        end_datetime: end,
        resolution: median(step_time.iter().copied()).unwrap_or(f64::NAN),
        total_duration: (end - start).num_milliseconds() as f64 / 8.64e7,
        n_df: times.len(),
    })
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GpsInfos {
    pub total_length: f64,
    pub dmax: f64,
    pub n_trip: usize,
    pub nest_position: Position,
    pub trip_statistics: Vec<TripStatistics>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TdrInfos {
    pub n_dives: usize,
    pub median_pressure: f64,
    pub median_depth: f64,
    pub max_depth: f64,
    pub mean_temperature: f64,
    pub dive_statistics: Vec<DiveStatistics>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AxyInfos {
    pub max_odba: f64,
    pub median_odba: f64,
    pub max_odba_f: f64,
    pub median_odba_f: f64,
}
