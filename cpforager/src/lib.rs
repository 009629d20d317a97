//! Trip and dive segmentation for central-place foraging seabirds.
//!
//! The crate turns time-stamped GPS, TDR and accelerometer readings into
//! step kinematics, foraging trips, dives and multi-resolution tables.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod accel;
pub mod check;
pub mod collection;
pub mod dives;
pub mod geodesy;
pub mod individual;
pub mod nest;
pub mod resample;
pub mod stats;
pub mod steps;
pub mod table;
pub mod trips;

pub use collection::{AxyCollection, GpsCollection, Individual, TdrCollection};
pub use individual::{Axy, Gps, GpsPoint, Tdr, TdrPoint};
pub use resample::{aggregate_between_samples, Aggregation};
pub use stats::{BasicInfos, DiveStatistics, TripStatistics};
pub use table::Table;

#[derive(Error, Debug)]
pub enum ForagerError {
    #[error("empty input sequence")]
    EmptyInput,
    #[error("missing {field} at row {row}")]
    MissingField { field: &'static str, row: usize },
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("reference resolution selects no rows")]
    EmptyResolution,
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("unknown aggregation '{0}' (expected sum, mean, min, max or len_unique_pos)")]
    UnknownAggregation(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("failed to parse parameters: {0}")]
    ParamsParse(String),
    #[error("{group}/{id}: {source}")]
    Individual {
        group: String,
        id: String,
        #[source]
        source: Box<ForagerError>,
    },
}

/// Longitude/latitude pair in degrees.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub longitude: f64,
    pub latitude: f64,
}

impl Position {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }
}

/// Bounding box inside which the nest is searched for.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Colony {
    pub center: Position,
    pub box_longitude: (f64, f64),
    pub box_latitude: (f64, f64),
}

impl Colony {
    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        longitude >= self.box_longitude.0
            && longitude <= self.box_longitude.1
            && latitude >= self.box_latitude.0
            && latitude <= self.box_latitude.1
    }
}

/// Externally computed day/night signal.
pub trait NightSignal: Sync {
    fn is_night(&self, timestamp: NaiveDateTime) -> bool;
}

/// Local sunrise and sunset wall-clock times at the colony.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Daylight {
    pub sunrise: NaiveTime,
    pub sunset: NaiveTime,
}

impl NightSignal for Daylight {
    fn is_night(&self, timestamp: NaiveDateTime) -> bool {
        let time = timestamp.time();
        time < self.sunrise || time > self.sunset
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Params {
    pub colony: Colony,
    /// km/h; faster steps are treated as GPS errors and removed.
    pub max_possible_speed: f64,
    /// km from the nest under which the bird counts as nesting.
    pub dist_threshold: f64,
    /// km/h above which a trip keeps going despite being close to the nest.
    pub speed_threshold: f64,
    /// km/h under which the bird is considered at nest.
    pub nesting_speed: f64,
    pub trip_min_duration: f64,
    pub trip_max_duration: f64,
    pub trip_min_length: f64,
    pub trip_max_length: f64,
    pub trip_min_steps: usize,
    /// meters
    pub diving_depth_threshold: f64,
    /// seconds
    pub dive_min_duration: f64,
    /// seconds of the rolling window used to remove the static acceleration.
    pub acc_time_window: f64,
    pub odba_p: f64,
    pub nest_position: Option<Position>,
    pub daylight: Option<Daylight>,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            colony: Colony::default(),
            max_possible_speed: 150.0,
            dist_threshold: 2.0,
            speed_threshold: 5.0,
            nesting_speed: 1.0,
            trip_min_duration: 20.0 * 60.0,
            trip_max_duration: 14.0 * 24.0 * 60.0 * 60.0,
            trip_min_length: 10.0,
            trip_max_length: 10_000.0,
            trip_min_steps: 10,
            diving_depth_threshold: 2.0,
            dive_min_duration: 2.0,
            acc_time_window: 2.0,
            odba_p: 1.0,
            nest_position: None,
            daylight: None,
        }
    }
}

impl Params {
    pub fn for_colony(colony: Colony) -> Self {
        Self {
            colony,
            ..Self::default()
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, ForagerError> {
        let params: Params =
            serde_json::from_str(text).map_err(|e| ForagerError::ParamsParse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ForagerError> {
        let (lon_min, lon_max) = self.colony.box_longitude;
        let (lat_min, lat_max) = self.colony.box_latitude;
        if !(lon_min <= lon_max) || !(lat_min <= lat_max) {
            return Err(ForagerError::InvalidParameter(
                "colony box bounds must be ordered (min, max)".into(),
            ));
        }
        let non_negative = [
            ("max_possible_speed", self.max_possible_speed),
            ("dist_threshold", self.dist_threshold),
            ("speed_threshold", self.speed_threshold),
            ("nesting_speed", self.nesting_speed),
            ("trip_min_duration", self.trip_min_duration),
            ("trip_min_length", self.trip_min_length),
            ("dive_min_duration", self.dive_min_duration),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ForagerError::InvalidParameter(format!(
                    "{name} must be >= 0 (got {value})"
                )));
            }
        }
        if !(self.trip_min_duration < self.trip_max_duration) {
            return Err(ForagerError::InvalidParameter(
                "trip_min_duration must be below trip_max_duration".into(),
            ));
        }
        if !(self.trip_min_length < self.trip_max_length) {
            return Err(ForagerError::InvalidParameter(
                "trip_min_length must be below trip_max_length".into(),
            ));
        }
        if !(self.acc_time_window > 0.0) {
            return Err(ForagerError::InvalidParameter(
                "acc_time_window must be > 0".into(),
            ));
        }
        if !(self.odba_p > 0.0) {
            return Err(ForagerError::InvalidParameter("odba_p must be > 0".into()));
        }
        if !self.diving_depth_threshold.is_finite() {
            return Err(ForagerError::InvalidParameter(
                "diving_depth_threshold must be finite".into(),
            ));
        }
        Ok(())
    }

    pub fn night_signal(&self) -> Option<&dyn NightSignal> {
        self.daylight.as_ref().map(|d| d as &dyn NightSignal)
    }
}

/// One logger reading. Channels absent from a given sensor are `None`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SensorRecord {
    pub timestamp: NaiveDateTime,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub pressure: Option<f64>,
    pub temperature: Option<f64>,
    pub ax: Option<f64>,
    pub ay: Option<f64>,
    pub az: Option<f64>,
}

impl SensorRecord {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            longitude: None,
            latitude: None,
            pressure: None,
            temperature: None,
            ax: None,
            ay: None,
            az: None,
        }
    }

    pub fn with_position(mut self, longitude: f64, latitude: f64) -> Self {
        self.longitude = Some(longitude);
        self.latitude = Some(latitude);
        self
    }

    pub fn with_tdr(mut self, pressure: f64, temperature: f64) -> Self {
        self.pressure = Some(pressure);
        self.temperature = Some(temperature);
        self
    }

    pub fn with_acceleration(mut self, ax: f64, ay: f64, az: f64) -> Self {
        self.ax = Some(ax);
        self.ay = Some(ay);
        self.az = Some(az);
        self
    }

    pub fn has_position(&self) -> bool {
        self.longitude.is_some() && self.latitude.is_some()
    }

    pub fn has_tdr(&self) -> bool {
        self.pressure.is_some() && self.temperature.is_some()
    }
}

/// Seconds elapsed since the first timestamp.
pub(crate) fn seconds_since_start(times: &[NaiveDateTime]) -> Vec<f64> {
    let Some(&t0) = times.first() else {
        return Vec::new();
    };
    times
        .iter()
        .map(|t| (*t - t0).num_milliseconds() as f64 / 1000.0)
        .collect()
}

/// Round half away from zero to `decimals` places; NaN and infinities pass through.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

pub(crate) fn nan_to_option(value: f64) -> Option<f64> {
    if value.is_nan() {
        None
    } else {
        Some(value)
    }
}
