use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use clap::{ArgAction, Parser, Subcommand, ValueHint};
use cpforager::check::{duplicate_count, unsorted_count};
use cpforager::stats::median;
use cpforager::steps::step_times;
use cpforager::{
    round_to, AxyCollection, Daylight, GpsCollection, Individual, Params, Position,
    SensorRecord, Table, TdrCollection,
};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Seabird trip and dive segmentation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Segment foraging trips from GPS CSV files
    Gps(PipelineArgs),
    /// Detect dives from TDR CSV files
    Tdr(PipelineArgs),
    /// Process accelerometer CSV files carrying GPS and TDR channels
    Axy(AxyArgs),
    /// Report timestamp quality, span and resolution of CSV files
    Diagnose(DiagnoseArgs),
}

#[derive(Parser, Debug)]
struct PipelineArgs {
    /// Logger CSV files to process
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// JSON parameters file (colony, thresholds, ...)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    params: Option<PathBuf>,

    /// Group name of every input (defaults to the parent directory name)
    #[arg(long)]
    group: Option<String>,

    /// Directory receiving the output tables
    #[arg(short, long, default_value = "results", value_hint = ValueHint::DirPath)]
    output_dir: PathBuf,

    /// Fixed nest longitude, skips nest estimation (needs --nest-lat)
    #[arg(long, requires = "nest_lat", allow_negative_numbers = true)]
    nest_lon: Option<f64>,

    /// Fixed nest latitude (needs --nest-lon)
    #[arg(long, requires = "nest_lon", allow_negative_numbers = true)]
    nest_lat: Option<f64>,

    /// Local sunrise time (HH:MM[:SS]) used to flag night samples
    #[arg(long, requires = "sunset")]
    sunrise: Option<String>,

    /// Local sunset time (HH:MM[:SS])
    #[arg(long, requires = "sunrise")]
    sunset: Option<String>,

    /// Speed (km/h) above which a fix is removed as a GPS error
    #[arg(long)]
    max_possible_speed: Option<f64>,

    /// Speed (km/h) under which an in-colony fix counts towards the nest
    #[arg(long)]
    nesting_speed: Option<f64>,

    /// Distance to nest (km) under which the bird is nesting
    #[arg(long)]
    dist_threshold: Option<f64>,

    /// Speed (km/h) above which trip boundaries are extended
    #[arg(long)]
    speed_threshold: Option<f64>,

    /// Minimum trip duration in seconds
    #[arg(long)]
    trip_min_duration: Option<f64>,

    /// Maximum trip duration in seconds
    #[arg(long)]
    trip_max_duration: Option<f64>,

    /// Minimum trip length in km
    #[arg(long)]
    trip_min_length: Option<f64>,

    /// Maximum trip length in km
    #[arg(long)]
    trip_max_length: Option<f64>,

    /// Minimum number of samples in a trip
    #[arg(long)]
    trip_min_steps: Option<usize>,

    /// Depth (m) above which the bird is diving
    #[arg(long)]
    diving_depth_threshold: Option<f64>,

    /// Minimum dive duration in seconds
    #[arg(long)]
    dive_min_duration: Option<f64>,

    /// Seconds of the rolling window removing static acceleration
    #[arg(long)]
    acc_time_window: Option<f64>,

    /// Exponent of the ODBA norm
    #[arg(long)]
    odba_p: Option<f64>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Profile major stages with timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct AxyArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Also write GPS positions interpolated at every accelerometer row
    #[arg(long, action = ArgAction::SetTrue)]
    interpolate: bool,
}

#[derive(Parser, Debug)]
struct DiagnoseArgs {
    /// CSV files to inspect
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    inputs: Vec<PathBuf>,

    /// Output report path
    #[arg(short, long, default_value = "diagnostics.txt", value_hint = ValueHint::FilePath)]
    output: PathBuf,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Gps(args) | Command::Tdr(args) => args.verbose,
        Command::Axy(args) => args.pipeline.verbose,
        Command::Diagnose(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Gps(args) => handle_gps(args),
        Command::Tdr(args) => handle_tdr(args),
        Command::Axy(args) => handle_axy(args),
        Command::Diagnose(args) => handle_diagnose(args),
    }
}

fn parse_time_of_day(text: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .with_context(|| format!("invalid time of day '{text}' (expected HH:MM[:SS])"))
}

fn load_params(args: &PipelineArgs) -> Result<Params> {
    let mut params = match args.params.as_ref() {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Params::from_json_str(&text)
                .with_context(|| format!("failed to load parameters from {}", path.display()))?
        }
        None => {
            warn!("no parameters file given, using defaults with an empty colony box");
            Params::default()
        }
    };

    if let (Some(lon), Some(lat)) = (args.nest_lon, args.nest_lat) {
        params.nest_position = Some(Position::new(lon, lat));
    }
    if let (Some(sunrise), Some(sunset)) = (args.sunrise.as_deref(), args.sunset.as_deref()) {
        params.daylight = Some(Daylight {
            sunrise: parse_time_of_day(sunrise)?,
            sunset: parse_time_of_day(sunset)?,
        });
    }
    if let Some(v) = args.max_possible_speed {
        params.max_possible_speed = v;
    }
    if let Some(v) = args.nesting_speed {
        params.nesting_speed = v;
    }
    if let Some(v) = args.dist_threshold {
        params.dist_threshold = v;
    }
    if let Some(v) = args.speed_threshold {
        params.speed_threshold = v;
    }
    if let Some(v) = args.trip_min_duration {
        params.trip_min_duration = v;
    }
    if let Some(v) = args.trip_max_duration {
        params.trip_max_duration = v;
    }
    if let Some(v) = args.trip_min_length {
        params.trip_min_length = v;
    }
    if let Some(v) = args.trip_max_length {
        params.trip_max_length = v;
    }
    if let Some(v) = args.trip_min_steps {
        params.trip_min_steps = v;
    }
    if let Some(v) = args.diving_depth_threshold {
        params.diving_depth_threshold = v;
    }
    if let Some(v) = args.dive_min_duration {
        params.dive_min_duration = v;
    }
    if let Some(v) = args.acc_time_window {
        params.acc_time_window = v;
    }
    if let Some(v) = args.odba_p {
        params.odba_p = v;
    }
    params.validate().context("invalid parameters")?;
    Ok(params)
}

/// Candidate separators, in tie-break order.
const SEPARATORS: [u8; 4] = [b';', b'\t', b',', b' '];

/// Separator splitting the header line into the most fields.
fn derive_separator(first_line: &str) -> Option<u8> {
    let line = first_line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }
    let mut best: Option<(u8, usize)> = None;
    for sep in SEPARATORS {
        let fields = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(sep)
            .from_reader(line.as_bytes())
            .records()
            .next()
            .and_then(|r| r.ok())
            .map_or(0, |r| r.len());
        if best.map_or(true, |(_, n)| fields > n) {
            best = Some((sep, fields));
        }
    }
    best.map(|(sep, _)| sep)
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%m/%d/%Y %H:%M:%S%.f",
];

fn parse_datetime(text: &str) -> Result<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            // dates alone are midnight
            ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"]
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| anyhow!("unrecognised datetime '{text}'"))
}

fn parse_value(text: &str) -> Result<Option<f64>> {
    let text = text.trim();
    if text.is_empty() || text.eq_ignore_ascii_case("na") || text.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    let value: f64 = text
        .parse()
        .with_context(|| format!("invalid number '{text}'"))?;
    Ok(Some(value))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TimeColumns {
    Datetime(usize),
    DateAndTime { date: usize, time: usize },
}

/// Positions of the known columns in a CSV header.
#[derive(Debug, Clone, PartialEq)]
struct ColumnLayout {
    time: TimeColumns,
    longitude: Option<usize>,
    latitude: Option<usize>,
    pressure: Option<usize>,
    temperature: Option<usize>,
    ax: Option<usize>,
    ay: Option<usize>,
    az: Option<usize>,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
        let find = |name: &str| names.iter().position(|n| n == name);
        let time = match (find("datetime"), find("date"), find("time")) {
            (Some(idx), _, _) => TimeColumns::Datetime(idx),
            (None, Some(date), Some(time)) => TimeColumns::DateAndTime { date, time },
            _ => bail!("no 'datetime' nor 'date' + 'time' columns in header"),
        };
        Ok(Self {
            time,
            longitude: find("longitude"),
            latitude: find("latitude"),
            pressure: find("pressure"),
            temperature: find("temperature"),
            ax: find("ax"),
            ay: find("ay"),
            az: find("az"),
        })
    }

    fn parse(&self, row: &csv::StringRecord) -> Result<SensorRecord> {
        let field = |idx: usize| row.get(idx).unwrap_or("");
        let timestamp = match self.time {
            TimeColumns::Datetime(idx) => parse_datetime(field(idx))?,
            TimeColumns::DateAndTime { date, time } => {
                parse_datetime(&format!("{} {}", field(date).trim(), field(time).trim()))?
            }
        };
        let value = |idx: Option<usize>| -> Result<Option<f64>> {
            match idx {
                Some(idx) => parse_value(field(idx)),
                None => Ok(None),
            }
        };
        let mut record = SensorRecord::new(timestamp);
        record.longitude = value(self.longitude)?;
        record.latitude = value(self.latitude)?;
        record.pressure = value(self.pressure)?;
        record.temperature = value(self.temperature)?;
        record.ax = value(self.ax)?;
        record.ay = value(self.ay)?;
        record.az = value(self.az)?;
        Ok(record)
    }
}

fn read_records(path: &Path) -> Result<Vec<SensorRecord>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut first_line = String::new();
    BufReader::new(file)
        .read_line(&mut first_line)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let delimiter =
        derive_separator(&first_line).ok_or_else(|| anyhow!("{} is empty", path.display()))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("failed to read header of {}", path.display()))?
        .clone();
    let layout = ColumnLayout::from_headers(&headers)
        .with_context(|| format!("unsupported layout in {}", path.display()))?;

    let mut records = Vec::new();
    for (row, line) in reader.records().enumerate() {
        let line = line.with_context(|| format!("failed to read row {} of {}", row + 1, path.display()))?;
        let record = layout
            .parse(&line)
            .with_context(|| format!("row {} of {}", row + 1, path.display()))?;
        records.push(record);
    }
    Ok(records)
}

fn file_id(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn group_of(path: &Path, group: Option<&str>) -> String {
    if let Some(group) = group {
        return group.to_string();
    }
    path.parent()
        .and_then(|p| p.file_name())
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string())
}

/// Parse every input in parallel; output keeps the command line order.
fn read_individuals(args: &PipelineArgs) -> Result<Vec<Individual>> {
    let t_parse = Instant::now();
    let mut parsed: Vec<(usize, Individual)> = args
        .inputs
        .par_iter()
        .enumerate()
        .map(|(idx, path)| -> Result<(usize, Individual)> {
            let records = read_records(path)?;
            info!("Read {} rows from {}", records.len(), path.display());
            let individual =
                Individual::new(group_of(path, args.group.as_deref()), file_id(path), records);
            Ok((idx, individual))
        })
        .collect::<Result<Vec<_>>>()?;
    parsed.sort_by_key(|(idx, _)| *idx);
    if args.profile || args.verbose {
        info!(
            "Parse stage: {:.1} ms",
            t_parse.elapsed().as_secs_f64() * 1000.0
        );
    }
    Ok(parsed.into_iter().map(|(_, individual)| individual).collect())
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Output decimals of a table column.
fn column_decimals(name: &str) -> Option<i32> {
    match name {
        "depth" => Some(2),
        "ax_f" | "ay_f" | "az_f" | "odba" | "odba_f" => Some(3),
        _ => None,
    }
}

fn write_table<W: Write>(table: &Table, writer: &mut csv::Writer<W>) -> Result<()> {
    let mut header = vec!["datetime".to_string()];
    header.extend(table.names().map(str::to_string));
    writer.write_record(&header)?;
    let columns: Vec<(&str, _)> = table.columns().collect();
    for (row, timestamp) in table.timestamps().iter().enumerate() {
        let mut record = vec![timestamp.format("%Y-%m-%d %H:%M:%S%.3f").to_string()];
        for (name, values) in &columns {
            let value = values[row];
            record.push(if value.is_nan() {
                String::new()
            } else {
                column_decimals(name)
                    .map_or(value, |d| round_to(value, d))
                    .to_string()
            });
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_table_csv(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_table(table, &mut writer).with_context(|| format!("failed to write {}", path.display()))
}

/// Creates the output directory and records the parameters the run used.
/// Prefix of the per-individual output files. Inputs sharing a file stem in
/// different groups stay apart.
fn output_stem(group: &str, id: &str) -> String {
    format!("{group}_{id}")
}

fn prepare_output_dir(dir: &Path, params: &Params) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join("params.json");
    let json = serde_json::to_string_pretty(params)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn handle_gps(args: PipelineArgs) -> Result<()> {
    let params = load_params(&args)?;
    prepare_output_dir(&args.output_dir, &params)?;
    let individuals = read_individuals(&args)?;

    let t_compute = Instant::now();
    let collection = GpsCollection::new(individuals, &params)?;
    if args.profile || args.verbose {
        info!(
            "Compute stage: {:.1} ms",
            t_compute.elapsed().as_secs_f64() * 1000.0
        );
    }

    for gps in &collection.gps {
        let stem = output_stem(&gps.group, &gps.id);
        let points = args.output_dir.join(format!("{stem}_gps.csv"));
        let trips = args.output_dir.join(format!("{stem}_trips.csv"));
        write_rows(&points, &gps.points)?;
        write_rows(&trips, &gps.infos.trip_statistics)?;
        info!(
            "{}/{}: {} trips, {:.1} km, dmax {:.1} km, nest ({:.5}, {:.5})",
            gps.group,
            gps.id,
            gps.n_trip(),
            gps.infos.total_length,
            gps.infos.dmax,
            gps.infos.nest_position.longitude,
            gps.infos.nest_position.latitude
        );
    }

    if collection.gps.len() > 1 {
        let path = args.output_dir.join("trip_statistics_all.csv");
        write_rows(&path, &collection.trip_statistics())?;
        write_rows(&args.output_dir.join("summary.csv"), &collection.summaries())?;
        info!("Wrote collection tables: {} trips", collection.n_trip());
    }
    info!("Wrote results to {}", args.output_dir.display());
    Ok(())
}

fn handle_tdr(args: PipelineArgs) -> Result<()> {
    let params = load_params(&args)?;
    prepare_output_dir(&args.output_dir, &params)?;
    let individuals = read_individuals(&args)?;

    let t_compute = Instant::now();
    let collection = TdrCollection::new(individuals, &params)?;
    if args.profile || args.verbose {
        info!(
            "Compute stage: {:.1} ms",
            t_compute.elapsed().as_secs_f64() * 1000.0
        );
    }

    for tdr in &collection.tdr {
        let stem = output_stem(&tdr.group, &tdr.id);
        write_rows(&args.output_dir.join(format!("{stem}_tdr.csv")), &tdr.points)?;
        write_rows(
            &args.output_dir.join(format!("{stem}_dives.csv")),
            &tdr.infos.dive_statistics,
        )?;
        info!(
            "{}/{}: {} dives, max depth {:.2} m",
            tdr.group,
            tdr.id,
            tdr.n_dives(),
            tdr.infos.max_depth
        );
    }

    if collection.tdr.len() > 1 {
        write_rows(
            &args.output_dir.join("dive_statistics_all.csv"),
            &collection.dive_statistics(),
        )?;
        write_rows(&args.output_dir.join("summary.csv"), &collection.summaries())?;
        info!("Wrote collection tables: {} dives", collection.n_dives());
    }
    info!("Wrote results to {}", args.output_dir.display());
    Ok(())
}

#[derive(Serialize)]
struct InterpolatedRow {
    datetime: NaiveDateTime,
    longitude: f64,
    latitude: f64,
    interp_proxy: f64,
}

fn handle_axy(args: AxyArgs) -> Result<()> {
    let pipeline = &args.pipeline;
    let params = load_params(pipeline)?;
    prepare_output_dir(&pipeline.output_dir, &params)?;
    let individuals = read_individuals(pipeline)?;

    let t_compute = Instant::now();
    let collection = AxyCollection::new(individuals, &params)?;
    if pipeline.profile || pipeline.verbose {
        info!(
            "Compute stage: {:.1} ms",
            t_compute.elapsed().as_secs_f64() * 1000.0
        );
    }

    let out = &pipeline.output_dir;
    for axy in &collection.axy {
        let stem = output_stem(&axy.group, &axy.id);
        write_table_csv(&axy.table, &out.join(format!("{stem}_axy.csv")))?;
        write_table_csv(&axy.gps_table, &out.join(format!("{stem}_axy_gps.csv")))?;
        write_rows(&out.join(format!("{stem}_gps.csv")), &axy.gps.points)?;
        write_rows(&out.join(format!("{stem}_tdr.csv")), &axy.tdr.points)?;
        write_rows(
            &out.join(format!("{stem}_trips.csv")),
            &axy.gps.infos.trip_statistics,
        )?;
        write_rows(
            &out.join(format!("{stem}_dives.csv")),
            &axy.tdr.infos.dive_statistics,
        )?;
        if args.interpolate {
            let interpolated = axy.interpolated_positions(true)?;
            let proxy = interpolated.proxy.unwrap_or_default();
            let rows: Vec<InterpolatedRow> = axy
                .table
                .timestamps()
                .iter()
                .enumerate()
                .map(|(i, &datetime)| InterpolatedRow {
                    datetime,
                    longitude: interpolated.longitude[i],
                    latitude: interpolated.latitude[i],
                    interp_proxy: proxy.get(i).copied().unwrap_or(f64::NAN),
                })
                .collect();
            write_rows(&out.join(format!("{stem}_interp.csv")), &rows)?;
        }
        info!(
            "{}/{}: {:.1} Hz, {} trips, {} dives, median odba {:.3}",
            axy.group,
            axy.id,
            axy.frequency(),
            axy.gps.n_trip(),
            axy.tdr.n_dives(),
            axy.infos.median_odba
        );
    }

    if collection.axy.len() > 1 {
        write_rows(&out.join("trip_statistics_all.csv"), &collection.trip_statistics())?;
        write_rows(&out.join("dive_statistics_all.csv"), &collection.dive_statistics())?;
        write_rows(&out.join("summary.csv"), &collection.summaries())?;
    }
    info!("Wrote results to {}", out.display());
    Ok(())
}

fn diagnose_file(path: &Path) -> Result<String> {
    let records = read_records(path)?;
    let times: Vec<NaiveDateTime> = records.iter().map(|r| r.timestamp).collect();
    let mut report = String::new();
    report.push_str(&format!("FILE: {}\n", path.display()));
    report.push_str(&format!("  records: {}\n", records.len()));
    if let (Some(start), Some(end)) = (times.iter().min(), times.iter().max()) {
        report.push_str(&format!("  start: {start}\n  end: {end}\n"));
        report.push_str(&format!(
            "  timespan_days: {:.3}\n",
            (*end - *start).num_seconds() as f64 / 86_400.0
        ));
    }
    let resolution = median(step_times(&times).iter().copied());
    report.push_str(&format!(
        "  resolution_s: {}\n",
        resolution.map_or("n/a".into(), |v| format!("{v:.3}"))
    ));
    report.push_str(&format!("  unsorted_rows: {}\n", unsorted_count(&times)));
    report.push_str(&format!("  duplicated_rows: {}\n", duplicate_count(&times)));
    let count = |f: fn(&SensorRecord) -> bool| records.iter().filter(|r| f(r)).count();
    report.push_str(&format!("  gps_rows: {}\n", count(SensorRecord::has_position)));
    report.push_str(&format!("  tdr_rows: {}\n", count(SensorRecord::has_tdr)));
    report.push_str(&format!(
        "  acceleration_rows: {}\n",
        count(|r| r.ax.is_some() && r.ay.is_some() && r.az.is_some())
    ));
    report.push('\n');
    Ok(report)
}

fn handle_diagnose(args: DiagnoseArgs) -> Result<()> {
    let mut report = String::new();
    for path in &args.inputs {
        report.push_str(&diagnose_file(path)?);
    }
    fs::write(&args.output, report)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("Diagnostic report written: {}", args.output.display());
    Ok(())
}
