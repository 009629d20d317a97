//! Per-individual pipelines for GPS, TDR and accelerometer (AXY) recordings.

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, warn};

use crate::accel::process_acceleration;
use crate::check::check_full;
use crate::dives::{depth_from_pressure, is_diving, segment_dives};
use crate::geodesy::{distances_to, headings_from};
use crate::nest::estimate_nest_position;
use crate::resample::{aggregate_between_samples, interpolate_positions, Aggregation, InterpolatedPositions};
use crate::stats::{
    basic_infos, dive_statistics, median, nan_max, nan_mean, nan_sum, trip_statistics, AxyInfos,
    BasicInfos, GpsInfos, TdrInfos,
};
use crate::steps::{compute_steps, step_times, suspicious_mask};
use crate::table::Table;
use crate::trips::{segment_trips, TripThresholds};
use crate::{nan_to_option, round_to, seconds_since_start, ForagerError, Params, SensorRecord};

/// One enriched GPS fix. Values are rounded for output.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct GpsPoint {
    pub timestamp: NaiveDateTime,
    pub longitude: f64,
    pub latitude: f64,
    pub step_time: Option<f64>,
    pub step_length: Option<f64>,
    pub step_speed: Option<f64>,
    pub step_heading: Option<f64>,
    pub step_turning_angle: Option<f64>,
    pub step_heading_to_nest: Option<f64>,
    pub dist_to_nest: Option<f64>,
    pub is_night: Option<bool>,
    pub trip: u32,
    /// Row of the input this fix was read from.
    #[serde(skip)]
    pub source_row: usize,
}

/// GPS recording of one individual.
#[derive(Clone, Debug)]
pub struct Gps {
    pub group: String,
    pub id: String,
    pub points: Vec<GpsPoint>,
    /// Rows dropped for exceeding `max_possible_speed` or for a zero step time.
    pub n_suspicious: usize,
    pub basic: BasicInfos,
    pub infos: GpsInfos,
}

fn retain_unflagged<T: Copy>(values: &[T], flags: &[bool]) -> Vec<T> {
    values
        .iter()
        .zip(flags)
        .filter_map(|(&v, &flagged)| (!flagged).then_some(v))
        .collect()
}

fn night_flags(times: &[NaiveDateTime], params: &Params) -> Vec<Option<bool>> {
    let signal = params.night_signal();
    times
        .iter()
        .map(|&t| signal.map(|s| s.is_night(t)))
        .collect()
}

fn rounded(value: f64, decimals: i32) -> Option<f64> {
    nan_to_option(round_to(value, decimals))
}

impl Gps {
    /// Every record must carry a position.
    pub fn new(
        records: &[SensorRecord],
        group: &str,
        id: &str,
        params: &Params,
    ) -> Result<Self, ForagerError> {
        params.validate()?;
        if records.is_empty() {
            return Err(ForagerError::EmptyInput);
        }
        let mut lon = Vec::with_capacity(records.len());
        let mut lat = Vec::with_capacity(records.len());
        for (row, record) in records.iter().enumerate() {
            lon.push(record.longitude.ok_or(ForagerError::MissingField {
                field: "longitude",
                row,
            })?);
            lat.push(record.latitude.ok_or(ForagerError::MissingField {
                field: "latitude",
                row,
            })?);
        }
        let times: Vec<NaiveDateTime> = records.iter().map(|r| r.timestamp).collect();
        check_full(&times);
        let source_rows = (0..records.len()).collect();
        Self::from_track(times, lon, lat, source_rows, group, id, params)
    }

    pub(crate) fn from_track(
        mut times: Vec<NaiveDateTime>,
        mut lon: Vec<f64>,
        mut lat: Vec<f64>,
        mut source_rows: Vec<usize>,
        group: &str,
        id: &str,
        params: &Params,
    ) -> Result<Self, ForagerError> {
        if times.is_empty() {
            return Err(ForagerError::EmptyInput);
        }
        let mut steps = compute_steps(&times, &lon, &lat);
        let suspicious = suspicious_mask(&steps.step_speed, params.max_possible_speed);
        let n_suspicious = suspicious.iter().filter(|&&s| s).count();
        if n_suspicious > 0 {
            warn!(group, id, n_suspicious, "removing rows faster than max_possible_speed");
            times = retain_unflagged(&times, &suspicious);
            lon = retain_unflagged(&lon, &suspicious);
            lat = retain_unflagged(&lat, &suspicious);
            source_rows = retain_unflagged(&source_rows, &suspicious);
            steps = compute_steps(&times, &lon, &lat);
        }

        let step_time = steps.step_time.to_vec();
        let step_length = steps.step_length.to_vec();
        let step_speed = steps.step_speed.to_vec();

        let nest = estimate_nest_position(
            &lon,
            &lat,
            &step_speed,
            &params.colony,
            params.nesting_speed,
            params.nest_position,
        );
        let dist_to_nest = distances_to(&lon, &lat, nest).to_vec();
        let heading_to_nest = headings_from(nest, &lon, &lat);

        let trip = segment_trips(
            &dist_to_nest,
            &step_speed,
            &seconds_since_start(&times),
            &step_length,
            &TripThresholds::from(params),
        );
        let is_night = night_flags(&times, params);

        let trip_table = trip_statistics(&trip, &times, &step_time, &step_length, &dist_to_nest);
        let infos = GpsInfos {
            total_length: nan_sum(&step_length),
            dmax: nan_max(&dist_to_nest).unwrap_or(f64::NAN),
            n_trip: trip_table.len(),
            nest_position: nest,
            trip_statistics: trip_table,
        };
        let basic = basic_infos(&times, &step_time).ok_or(ForagerError::EmptyInput)?;

        let points = (0..times.len())
            .map(|i| GpsPoint {
                timestamp: times[i],
                longitude: lon[i],
                latitude: lat[i],
                step_time: nan_to_option(step_time[i]),
                step_length: rounded(step_length[i], 3),
                step_speed: rounded(step_speed[i], 3),
                step_heading: rounded(steps.step_heading[i], 1),
                step_turning_angle: rounded(steps.step_turning_angle[i], 1),
                step_heading_to_nest: rounded(heading_to_nest[i], 1),
                dist_to_nest: rounded(dist_to_nest[i], 3),
                is_night: is_night[i],
                trip: trip[i],
                source_row: source_rows[i],
            })
            .collect();

        debug!(
            group,
            id,
            n_points = times.len(),
            n_trip = infos.n_trip,
            "gps processed"
        );
        Ok(Self {
            group: group.to_string(),
            id: id.to_string(),
            points,
            n_suspicious,
            basic,
            infos,
        })
    }

    pub fn n_trip(&self) -> usize {
        self.infos.n_trip
    }
}

/// One enriched TDR reading.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TdrPoint {
    pub timestamp: NaiveDateTime,
    pub pressure: f64,
    pub temperature: f64,
    pub step_time: Option<f64>,
    pub is_night: Option<bool>,
    pub depth: Option<f64>,
    pub is_diving: bool,
    pub dive: u32,
    #[serde(skip)]
    pub source_row: usize,
}

/// TDR recording of one individual.
#[derive(Clone, Debug)]
pub struct Tdr {
    pub group: String,
    pub id: String,
    pub points: Vec<TdrPoint>,
    pub basic: BasicInfos,
    pub infos: TdrInfos,
}

impl Tdr {
    /// Records without both pressure and temperature are skipped.
    pub fn new(
        records: &[SensorRecord],
        group: &str,
        id: &str,
        params: &Params,
    ) -> Result<Self, ForagerError> {
        params.validate()?;
        let mut times = Vec::new();
        let mut pressure = Vec::new();
        let mut temperature = Vec::new();
        let mut source_rows = Vec::new();
        for (row, record) in records.iter().enumerate() {
            if let (Some(p), Some(t)) = (record.pressure, record.temperature) {
                times.push(record.timestamp);
                pressure.push(p);
                temperature.push(t);
                source_rows.push(row);
            }
        }
        if records.len() > times.len() {
            debug!(
                group,
                id,
                skipped = records.len() - times.len(),
                "records without pressure or temperature"
            );
        }
        check_full(&times);
        Self::from_series(times, pressure, temperature, source_rows, group, id, params)
    }

    pub(crate) fn from_series(
        times: Vec<NaiveDateTime>,
        pressure: Vec<f64>,
        temperature: Vec<f64>,
        source_rows: Vec<usize>,
        group: &str,
        id: &str,
        params: &Params,
    ) -> Result<Self, ForagerError> {
        if times.is_empty() {
            return Err(ForagerError::EmptyInput);
        }
        let step_time = step_times(&times).to_vec();
        let depth = depth_from_pressure(&pressure);
        let diving = is_diving(&depth, params.diving_depth_threshold);
        let dive = segment_dives(&diving, &seconds_since_start(&times), params.dive_min_duration);
        let is_night = night_flags(&times, params);

        let dive_table = dive_statistics(&dive, &times, &depth);
        let infos = TdrInfos {
            n_dives: dive_table.len(),
            median_pressure: median(pressure.iter().copied()).unwrap_or(f64::NAN),
            median_depth: median(depth.iter().copied()).unwrap_or(f64::NAN),
            max_depth: nan_max(&depth).unwrap_or(f64::NAN),
            mean_temperature: nan_mean(&temperature).unwrap_or(f64::NAN),
            dive_statistics: dive_table,
        };
        let basic = basic_infos(&times, &step_time).ok_or(ForagerError::EmptyInput)?;

        let points = (0..times.len())
            .map(|i| TdrPoint {
                timestamp: times[i],
                pressure: pressure[i],
                temperature: temperature[i],
                step_time: nan_to_option(step_time[i]),
                is_night: is_night[i],
                depth: rounded(depth[i], 2),
                is_diving: diving[i],
                dive: dive[i],
                source_row: source_rows[i],
            })
            .collect();

        debug!(group, id, n_points = times.len(), n_dives = infos.n_dives, "tdr processed");
        Ok(Self {
            group: group.to_string(),
            id: id.to_string(),
            points,
            basic,
            infos,
        })
    }

    pub fn n_dives(&self) -> usize {
        self.infos.n_dives
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

fn column(records: &[SensorRecord], get: impl Fn(&SensorRecord) -> Option<f64>) -> Vec<f64> {
    records.iter().map(|r| get(r).unwrap_or(f64::NAN)).collect()
}

/// Per-fix aggregation of the full-resolution columns.
fn gps_resolution_aggregations() -> Vec<(String, Aggregation)> {
    [
        ("odba", Aggregation::Sum),
        ("odba_f", Aggregation::Sum),
        ("step_time", Aggregation::Sum),
        ("is_diving", Aggregation::Sum),
        ("pressure", Aggregation::Max),
        ("depth", Aggregation::Max),
        ("is_diving", Aggregation::Max),
        ("temperature", Aggregation::Mean),
        ("dive", Aggregation::CountUniquePositive),
    ]
    .into_iter()
    .map(|(column, aggregation)| (column.to_string(), aggregation))
    .collect()
}

/// Aggregated column and the name it takes in the GPS-resolution table.
const GPS_RESOLUTION_COLUMNS: [(&str, &str); 9] = [
    ("odba_sum", "odba"),
    ("odba_f_sum", "odba_f"),
    ("step_time_sum", "step_time"),
    ("is_diving_max", "is_diving"),
    ("is_diving_sum", "n_diving_samples"),
    ("dive_len_unique_pos", "n_dives"),
    ("pressure_max", "pressure"),
    ("depth_max", "depth"),
    ("temperature_mean", "temperature"),
];

/// Accelerometer recording with embedded GPS and TDR channels.
#[derive(Clone, Debug)]
pub struct Axy {
    pub group: String,
    pub id: String,
    /// Full-resolution table: raw channels plus step time, night flag,
    /// filtered axes, ODBA, depth, diving flag and dive id.
    pub table: Table,
    /// One row per GPS fix, holding the aggregated full-resolution columns.
    pub gps_table: Table,
    pub gps: Gps,
    pub tdr: Tdr,
    pub basic: BasicInfos,
    pub infos: AxyInfos,
}

impl Axy {
    pub fn new(
        records: &[SensorRecord],
        group: &str,
        id: &str,
        params: &Params,
    ) -> Result<Self, ForagerError> {
        params.validate()?;
        if records.is_empty() {
            return Err(ForagerError::EmptyInput);
        }
        let times: Vec<NaiveDateTime> = records.iter().map(|r| r.timestamp).collect();
        check_full(&times);

        let ax = column(records, |r| r.ax);
        let ay = column(records, |r| r.ay);
        let az = column(records, |r| r.az);
        let pressure = column(records, |r| r.pressure);
        let temperature = column(records, |r| r.temperature);
        let step_time = step_times(&times).to_vec();
        let is_night: Vec<f64> = night_flags(&times, params)
            .into_iter()
            .map(|n| n.map_or(f64::NAN, flag))
            .collect();

        let acc = process_acceleration(
            &ax,
            &ay,
            &az,
            &step_time,
            params.acc_time_window,
            params.odba_p,
        );
        let depth = depth_from_pressure(&pressure);
        let diving: Vec<f64> = is_diving(&depth, params.diving_depth_threshold)
            .into_iter()
            .map(flag)
            .collect();

        let tdr_rows: Vec<usize> = (0..records.len()).filter(|&i| records[i].has_tdr()).collect();
        let tdr = Tdr::from_series(
            tdr_rows.iter().map(|&i| times[i]).collect(),
            tdr_rows.iter().map(|&i| pressure[i]).collect(),
            tdr_rows.iter().map(|&i| temperature[i]).collect(),
            tdr_rows,
            group,
            id,
            params,
        )?;
        let mut dive = vec![0.0; records.len()];
        for point in &tdr.points {
            dive[point.source_row] = f64::from(point.dive);
        }

        let table = Table::new(times.clone())
            .with_column("ax", ax)?
            .with_column("ay", ay)?
            .with_column("az", az)?
            .with_column("longitude", column(records, |r| r.longitude))?
            .with_column("latitude", column(records, |r| r.latitude))?
            .with_column("pressure", pressure)?
            .with_column("temperature", temperature)?
            .with_column("step_time", step_time.clone())?
            .with_column("is_night", is_night)?
            .with_column("ax_f", acc.ax_f)?
            .with_column("ay_f", acc.ay_f)?
            .with_column("az_f", acc.az_f)?
            .with_column("odba", acc.odba)?
            .with_column("odba_f", acc.odba_f)?
            .with_column("depth", depth)?
            .with_column("is_diving", diving)?
            .with_column("dive", dive)?;

        let gps_mask: Vec<bool> = records.iter().map(SensorRecord::has_position).collect();
        let aggregated = aggregate_between_samples(&table, &gps_mask, &gps_resolution_aggregations())?
            .select_rows(&gps_mask)?;
        let gps_rows: Vec<usize> = (0..records.len()).filter(|&i| gps_mask[i]).collect();

        let mut gps_table = Table::new(aggregated.timestamps().to_vec())
            .with_column("longitude", aggregated.require("longitude")?.clone())?
            .with_column("latitude", aggregated.require("latitude")?.clone())?;
        for (source, name) in GPS_RESOLUTION_COLUMNS {
            gps_table.push_column(name, aggregated.require(source)?.clone())?;
        }

        let gps = Gps::from_track(
            gps_table.timestamps().to_vec(),
            gps_table.require("longitude")?.to_vec(),
            gps_table.require("latitude")?.to_vec(),
            gps_rows,
            group,
            id,
            params,
        )?;

        let odba = table.require("odba")?;
        let odba_f = table.require("odba_f")?;
        let infos = AxyInfos {
            max_odba: nan_max(odba).unwrap_or(f64::NAN),
            median_odba: median(odba.iter().copied()).unwrap_or(f64::NAN),
            max_odba_f: nan_max(odba_f).unwrap_or(f64::NAN),
            median_odba_f: median(odba_f.iter().copied()).unwrap_or(f64::NAN),
        };
        let basic = basic_infos(&times, &step_time).ok_or(ForagerError::EmptyInput)?;

        debug!(
            group,
            id,
            n_rows = table.len(),
            n_gps = gps_table.len(),
            n_tdr = tdr.points.len(),
            "axy processed"
        );
        Ok(Self {
            group: group.to_string(),
            id: id.to_string(),
            table,
            gps_table,
            gps,
            tdr,
            basic,
            infos,
        })
    }

    /// Positions of the cleaned GPS track interpolated at every full-resolution row.
    pub fn interpolated_positions(&self, with_proxy: bool) -> Result<InterpolatedPositions, ForagerError> {
        let times: Vec<NaiveDateTime> = self.gps.points.iter().map(|p| p.timestamp).collect();
        let lon: Vec<f64> = self.gps.points.iter().map(|p| p.longitude).collect();
        let lat: Vec<f64> = self.gps.points.iter().map(|p| p.latitude).collect();
        interpolate_positions(&times, &lon, &lat, self.table.timestamps(), with_proxy)
    }

    /// Recording frequency in Hz.
    pub fn frequency(&self) -> f64 {
        1.0 / self.basic.resolution
    }
}
