//! Dynamic acceleration and overall dynamic body acceleration (ODBA).

use crate::stats::median;

/// Samples covered by a `time_window` seconds window at the given resolution.
pub fn window_size(time_window: f64, resolution: f64) -> usize {
    let samples = (time_window / resolution).floor();
    if samples.is_finite() && samples >= 1.0 {
        samples as usize
    } else {
        1
    }
}

/// Centred rolling mean, NaN-skipping, at least one value per window.
///
/// The window of sample `i` spans `[i - w/2, i - w/2 + w)`, clipped to the
/// sequence. A window holding only NaN gives NaN.
pub fn centered_rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let window = window.max(1);
    let half = window / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + window - half).min(n);
            let (sum, count) = values[lo..hi]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0f64, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect()
}

/// Acceleration minus its centred rolling mean (the static component).
pub fn filtered_acceleration(values: &[f64], window: usize) -> Vec<f64> {
    values
        .iter()
        .zip(centered_rolling_mean(values, window))
        .map(|(v, mean)| v - mean)
        .collect()
}

/// p-norm of the three acceleration axes.
pub fn odba(ax: &[f64], ay: &[f64], az: &[f64], p: f64) -> Vec<f64> {
    ax.iter()
        .zip(ay)
        .zip(az)
        .map(|((x, y), z)| (x.abs().powf(p) + y.abs().powf(p) + z.abs().powf(p)).powf(1.0 / p))
        .collect()
}

/// Filtered axes and both ODBA flavours of a recording.
#[derive(Clone, Debug)]
pub struct AccelerationColumns {
    pub ax_f: Vec<f64>,
    pub ay_f: Vec<f64>,
    pub az_f: Vec<f64>,
    pub odba: Vec<f64>,
    pub odba_f: Vec<f64>,
}

/// `step_time` gives the resolution (median step time) used to size the window.
pub fn process_acceleration(
    ax: &[f64],
    ay: &[f64],
    az: &[f64],
    step_time: &[f64],
    time_window: f64,
    p: f64,
) -> AccelerationColumns {
    let resolution = median(step_time.iter().copied()).unwrap_or(f64::NAN);
    let window = window_size(time_window, resolution);
    let ax_f = filtered_acceleration(ax, window);
    let ay_f = filtered_acceleration(ay, window);
    let az_f = filtered_acceleration(az, window);
    AccelerationColumns {
        odba: odba(ax, ay, az, p),
        odba_f: odba(&ax_f, &ay_f, &az_f, p),
        ax_f,
        ay_f,
        az_f,
    }
}
