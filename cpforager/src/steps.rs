//! Per-step kinematics derived from a time-ordered position sequence.
//!
//! Every column has one value per sample; the value at index `i` describes
//! the step from sample `i - 1` to sample `i`, so the first entry is NaN.

use chrono::NaiveDateTime;
use ndarray::Array1;

use crate::geodesy::{ortho_distance, spherical_heading};

/// Step columns at full floating precision. NaN marks an undefined value.
#[derive(Clone, Debug)]
pub struct StepColumns {
    pub step_time: Array1<f64>,
    pub step_length: Array1<f64>,
    pub step_speed: Array1<f64>,
    pub step_heading: Array1<f64>,
    pub step_turning_angle: Array1<f64>,
}

impl StepColumns {
    pub fn len(&self) -> usize {
        self.step_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.step_time.is_empty()
    }
}

/// Seconds between consecutive timestamps.
pub fn step_times(times: &[NaiveDateTime]) -> Array1<f64> {
    let mut out = Array1::from_elem(times.len(), f64::NAN);
    for i in 1..times.len() {
        out[i] = (times[i] - times[i - 1]).num_milliseconds() as f64 / 1000.0;
    }
    out
}

/// Great-circle length in km of every step.
pub fn step_lengths(lon: &[f64], lat: &[f64]) -> Array1<f64> {
    let mut out = Array1::from_elem(lon.len(), f64::NAN);
    for i in 1..lon.len() {
        out[i] = ortho_distance(lon[i - 1], lat[i - 1], lon[i], lat[i]);
    }
    out
}

/// Speed in km/h. A zero step time gives an infinite (or NaN) speed.
pub fn step_speeds(step_length: &Array1<f64>, step_time: &Array1<f64>) -> Array1<f64> {
    step_length
        .iter()
        .zip(step_time.iter())
        .map(|(&len, &dt)| len / (dt / 3600.0))
        .collect()
}

pub fn step_headings(lon: &[f64], lat: &[f64]) -> Array1<f64> {
    let mut out = Array1::from_elem(lon.len(), f64::NAN);
    for i in 1..lon.len() {
        out[i] = spherical_heading(lon[i - 1], lat[i - 1], lon[i], lat[i]);
    }
    out
}

/// Maps a heading difference into (-180, 180].
pub fn normalize_turn(delta: f64) -> f64 {
    let wrapped = delta.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

pub fn step_turning_angles(step_heading: &Array1<f64>) -> Array1<f64> {
    let mut out = Array1::from_elem(step_heading.len(), f64::NAN);
    for i in 1..step_heading.len() {
        out[i] = normalize_turn(step_heading[i] - step_heading[i - 1]);
    }
    out
}

pub fn compute_steps(times: &[NaiveDateTime], lon: &[f64], lat: &[f64]) -> StepColumns {
    let step_time = step_times(times);
    let step_length = step_lengths(lon, lat);
    let step_speed = step_speeds(&step_length, &step_time);
    let step_heading = step_headings(lon, lat);
    let step_turning_angle = step_turning_angles(&step_heading);
    StepColumns {
        step_time,
        step_length,
        step_speed,
        step_heading,
        step_turning_angle,
    }
}

/// Rows whose speed exceeds what the animal can physically reach, or is
/// undefined after a zero step time. Row 0 has no step and is never flagged.
pub fn suspicious_mask(step_speed: &Array1<f64>, max_possible_speed: f64) -> Vec<bool> {
    step_speed
        .iter()
        .enumerate()
        .map(|(i, &v)| i > 0 && (v.is_nan() || v > max_possible_speed))
        .collect()
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

    #[test]
    fn test_first_step_is_undefined() {
        let steps = compute_steps(&[at(0), at(60)], &[0.0, 0.01], &[0.0, 0.0]);
        assert!(steps.step_time[0].is_nan());
        assert!(steps.step_length[0].is_nan());
        assert!(steps.step_speed[0].is_nan());
        assert!(steps.step_heading[0].is_nan());
        assert!(steps.step_turning_angle[0].is_nan());
        assert_eq!(steps.step_time[1], 60.0);
        assert!((steps.step_heading[1] - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_in_km_per_hour() {
        let steps = compute_steps(&[at(0), at(3600)], &[0.0, 1.0], &[0.0, 0.0]);
        assert!((steps.step_speed[1] - steps.step_length[1]).abs() < 1e-9);
    }

    #[test]
    fn test_zero_step_time_gives_invalid_speed() {
        let steps = compute_steps(
            &[at(0), at(0), at(0)],
            &[0.0, 0.1, 0.1],
            &[0.0, 0.0, 0.0],
        );
        assert_eq!(steps.step_speed[1], f64::INFINITY);
        assert!(steps.step_speed[2].is_nan());
        assert_eq!(suspicious_mask(&steps.step_speed, 150.0), vec![false, true, true]);
    }

    #[test]
    fn test_turning_angle_sign() {
        // north, then east: a right turn of 90 degrees
        let steps = compute_steps(
            &[at(0), at(60), at(120)],
            &[0.0, 0.0, 0.01],
            &[0.0, 0.01, 0.01],
        );
        assert!((steps.step_turning_angle[2] - 90.0).abs() < 1e-3);
        assert_eq!(normalize_turn(-90.0), 270.0 - 360.0);
        assert_eq!(normalize_turn(180.0), 180.0);
        assert_eq!(normalize_turn(-180.0), 180.0);
        assert_eq!(normalize_turn(350.0), -10.0);
    }

    proptest! {
        #[test]
        fn prop_turning_angle_in_range(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            let turn = normalize_turn(b - a);
            prop_assert!(turn > -180.0 && turn <= 180.0, "turn {}", turn);
        }
    }
}
