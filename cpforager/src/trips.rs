//! Foraging trip segmentation.
//!
//! A trip candidate is a maximal run of samples farther than
//! `dist_threshold` from the nest. Each candidate is widened while the bird is
//! still moving fast at its boundaries; widening forward into the next
//! candidate absorbs it. Surviving intervals are checked against duration,
//! length and step-count bounds and numbered from 1. Sample labels are 0
//! outside accepted trips.

use tracing::debug;

use crate::stats::nan_sum;
use crate::Params;

/// Thresholds used by [`segment_trips`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TripThresholds {
    pub dist_threshold: f64,
    pub speed_threshold: f64,
    pub min_duration: f64,
    pub max_duration: f64,
    pub min_length: f64,
    pub max_length: f64,
    pub min_steps: usize,
}

impl From<&Params> for TripThresholds {
    fn from(params: &Params) -> Self {
        Self {
            dist_threshold: params.dist_threshold,
            speed_threshold: params.speed_threshold,
            min_duration: params.trip_min_duration,
            max_duration: params.trip_max_duration,
            min_length: params.trip_min_length,
            max_length: params.trip_max_length,
            min_steps: params.trip_min_steps,
        }
    }
}

/// Inclusive index interval of one trip.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TripInterval {
    pub start: usize,
    pub end: usize,
}

impl TripInterval {
    pub fn steps(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Start/end indices of every maximal run of away-from-nest samples.
pub fn trip_candidates(dist_to_nest: &[f64], dist_threshold: f64) -> Vec<TripInterval> {
    let mut candidates = Vec::new();
    let mut open: Option<usize> = None;
    for (i, &d) in dist_to_nest.iter().enumerate() {
        // NaN distances count as away
        let nesting = d <= dist_threshold;
        match (open, nesting) {
            (None, false) => open = Some(i),
            (Some(start), true) => {
                candidates.push(TripInterval { start, end: i - 1 });
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        candidates.push(TripInterval {
            start,
            end: dist_to_nest.len() - 1,
        });
    }
    candidates
}

/// Widen candidates at high speed, merge the ones that touch and keep the valid ones.
///
/// `times` are seconds since any fixed origin. A NaN speed stops a widening,
/// an infinite speed continues it up to the sequence ends.
pub fn valid_trip_intervals(
    dist_to_nest: &[f64],
    step_speed: &[f64],
    times: &[f64],
    step_length: &[f64],
    thresholds: &TripThresholds,
) -> Vec<TripInterval> {
    let n = dist_to_nest.len();
    let candidates = trip_candidates(dist_to_nest, thresholds.dist_threshold);
    let fast = |i: usize| step_speed[i] > thresholds.speed_threshold;

    let mut valids = Vec::new();
    // first index the next trip may extend back to
    let mut floor = 0usize;
    let mut k = 0usize;
    while k < candidates.len() {
        let mut t_start = candidates[k].start.max(floor);
        let mut t_end = candidates[k].end.max(t_start);

        while t_start > floor && fast(t_start) {
            t_start -= 1;
        }

        while t_end + 1 < n && fast(t_end) {
            t_end += 1;
            while k + 1 < candidates.len() && t_end >= candidates[k + 1].start {
                k += 1;
                t_end = t_end.max(candidates[k].end);
            }
        }
        floor = t_end + 1;

        let duration = times[t_end] - times[t_start];
        let length = nan_sum(&step_length[t_start..=t_end]);
        let interval = TripInterval {
            start: t_start,
            end: t_end,
        };
        let steps = interval.steps();
        let valid = duration > thresholds.min_duration
            && duration < thresholds.max_duration
            && length > thresholds.min_length
            && length < thresholds.max_length
            && steps > thresholds.min_steps;
        debug!(
            start = t_start,
            end = t_end,
            duration,
            length,
            steps,
            valid,
            "trip candidate"
        );
        if valid {
            valids.push(interval);
        }
        k += 1;
    }
    valids
}

/// Trip id of every sample: 1, 2, … in order, 0 outside trips.
pub fn segment_trips(
    dist_to_nest: &[f64],
    step_speed: &[f64],
    times: &[f64],
    step_length: &[f64],
    thresholds: &TripThresholds,
) -> Vec<u32> {
    let mut trip = vec![0u32; dist_to_nest.len()];
    let intervals =
        valid_trip_intervals(dist_to_nest, step_speed, times, step_length, thresholds);
    for (id, interval) in intervals.iter().enumerate() {
        trip[interval.start..=interval.end].fill(id as u32 + 1);
    }
    trip
}
