//! Pressure-derived depth and dive segmentation.

use tracing::debug;

use crate::stats::median;

const SALT_WATER_DENSITY: f64 = 1023.6;
const EARTH_ACCELERATION: f64 = 9.80665;

/// Depth in meters relative to the median pressure (hPa) of the recording.
///
/// An all-NaN pressure column gives an all-NaN depth.
pub fn depth_from_pressure(pressure: &[f64]) -> Vec<f64> {
    let Some(p_atm) = median(pressure.iter().copied()) else {
        return vec![f64::NAN; pressure.len()];
    };
    pressure
        .iter()
        .map(|p| 100.0 * (p - p_atm) / (SALT_WATER_DENSITY * EARTH_ACCELERATION))
        .collect()
}

/// NaN depths are not diving.
pub fn is_diving(depth: &[f64], diving_depth_threshold: f64) -> Vec<bool> {
    depth.iter().map(|&d| d > diving_depth_threshold).collect()
}

/// Dive id of every sample: maximal diving runs lasting at least
/// `min_duration` seconds (`t[end] - t[start]`) get ids 1, 2, …; everything
/// else is 0.
pub fn segment_dives(diving: &[bool], times: &[f64], min_duration: f64) -> Vec<u32> {
    let mut dive = vec![0u32; diving.len()];
    let mut next_id = 1u32;
    let mut i = 0;
    while i < diving.len() {
        if !diving[i] {
            i += 1;
            continue;
        }
        let start = i;
        while i + 1 < diving.len() && diving[i + 1] {
            i += 1;
        }
        let end = i;
        let duration = times[end] - times[start];
        if duration >= min_duration {
            dive[start..=end].fill(next_id);
            next_id += 1;
        } else {
            debug!(start, end, duration, "dive too short, discarded");
        }
        i += 1;
    }
    dive
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_is_relative_to_median_pressure() {
        let depth = depth_from_pressure(&[1010.0, 1010.0, 1010.0 + 1023.6 * 9.80665 / 100.0]);
        assert_eq!(depth[0], 0.0);
        assert!((depth[2] - 1.0).abs() < 1e-12);
        assert!(depth_from_pressure(&[f64::NAN, f64::NAN]).iter().all(|d| d.is_nan()));
        assert!(depth_from_pressure(&[]).is_empty());
    }

    #[test]
    fn test_single_dive() {
        let depth = [0.0, 0.0, 3.0, 4.0, 3.0, 0.0, 0.0];
        let diving = is_diving(&depth, 2.0);
        assert_eq!(diving, vec![false, false, true, true, true, false, false]);
        let times: Vec<f64> = (0..7).map(f64::from).collect();
        assert_eq!(segment_dives(&diving, &times, 2.0), vec![0, 0, 1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_short_dives_are_dropped_without_gaps_in_ids() {
        let diving = [true, false, true, true, true, false, true, false, true, true, true];
        let times: Vec<f64> = (0..11).map(f64::from).collect();
        assert_eq!(
            segment_dives(&diving, &times, 2.0),
            vec![0, 0, 1, 1, 1, 0, 0, 0, 2, 2, 2]
        );
    }

    #[test]
    fn test_nan_depth_is_not_diving() {
        assert_eq!(is_diving(&[f64::NAN, 5.0], 2.0), vec![false, true]);
        assert!(segment_dives(&[], &[], 2.0).is_empty());
    }
}
