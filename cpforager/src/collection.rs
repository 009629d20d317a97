//! Several individuals processed in parallel and merged in (group, id) order.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::individual::{Axy, Gps, Tdr};
use crate::stats::{DiveStatistics, TripStatistics};
use crate::{ForagerError, Params, SensorRecord};

/// Raw recording of one individual.
#[derive(Clone, Debug)]
pub struct Individual {
    pub group: String,
    pub id: String,
    pub records: Vec<SensorRecord>,
}

impl Individual {
    pub fn new(group: impl Into<String>, id: impl Into<String>, records: Vec<SensorRecord>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
            records,
        }
    }
}

/// Trip row of a merged table.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CollectionTrip {
    pub group: String,
    pub id: String,
    pub trip_id: String,
    pub length: f64,
    pub duration: f64,
    pub max_hole: f64,
    pub dmax: f64,
    pub n_step: usize,
}

/// Dive row of a merged table.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CollectionDive {
    pub group: String,
    pub id: String,
    pub dive_id: String,
    pub duration: f64,
    pub max_depth: f64,
    pub n_step: usize,
}

/// One summary row per individual.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CollectionSummary {
    pub group: String,
    pub id: String,
    pub start_datetime: NaiveDateTime,
    pub end_datetime: NaiveDateTime,
    pub n_df: usize,
    pub resolution: f64,
    pub total_duration: f64,
    pub total_length: Option<f64>,
    pub dmax: Option<f64>,
    pub n_trip: Option<usize>,
    pub n_dives: Option<usize>,
    pub nest_longitude: Option<f64>,
    pub nest_latitude: Option<f64>,
}

fn trip_rows(gps: &Gps) -> impl Iterator<Item = CollectionTrip> + '_ {
    gps.infos.trip_statistics.iter().map(move |t: &TripStatistics| CollectionTrip {
        group: gps.group.clone(),
        id: gps.id.clone(),
        trip_id: format!("{}_{}_T{:04}", gps.group, gps.id, t.id),
        length: t.length,
        duration: t.duration,
        max_hole: t.max_hole,
        dmax: t.dmax,
        n_step: t.n_step,
    })
}

fn dive_rows(tdr: &Tdr) -> impl Iterator<Item = CollectionDive> + '_ {
    tdr.infos.dive_statistics.iter().map(move |d: &DiveStatistics| CollectionDive {
        group: tdr.group.clone(),
        id: tdr.id.clone(),
        dive_id: format!("{}_{}_D{:04}", tdr.group, tdr.id, d.id),
        duration: d.duration,
        max_depth: d.max_depth,
        n_step: d.n_step,
    })
}

/// Run `build` on every individual in parallel. Output follows (group, id)
/// order whatever the input order or scheduling.
fn build_all<T, F>(mut individuals: Vec<Individual>, build: F) -> Result<Vec<T>, ForagerError>
where
    T: Send,
    F: Fn(&Individual) -> Result<T, ForagerError> + Sync,
{
    individuals.sort_by(|a, b| (&a.group, &a.id).cmp(&(&b.group, &b.id)));
    individuals
        .par_iter()
        .map(|individual| {
            build(individual).map_err(|e| ForagerError::Individual {
                group: individual.group.clone(),
                id: individual.id.clone(),
                source: Box::new(e),
            })
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct GpsCollection {
    pub gps: Vec<Gps>,
}

impl GpsCollection {
    pub fn new(individuals: Vec<Individual>, params: &Params) -> Result<Self, ForagerError> {
        let gps = build_all(individuals, |i| Gps::new(&i.records, &i.group, &i.id, params))?;
        info!(n_individuals = gps.len(), "gps collection built");
        Ok(Self { gps })
    }

    pub fn trip_statistics(&self) -> Vec<CollectionTrip> {
        self.gps.iter().flat_map(trip_rows).collect()
    }

    pub fn summaries(&self) -> Vec<CollectionSummary> {
        self.gps.iter().map(gps_summary).collect()
    }

    pub fn n_trip(&self) -> usize {
        self.gps.iter().map(Gps::n_trip).sum()
    }
}

fn gps_summary(gps: &Gps) -> CollectionSummary {
    CollectionSummary {
        group: gps.group.clone(),
        id: gps.id.clone(),
        start_datetime: gps.basic.start_datetime,
        end_datetime: gps.basic.end_datetime,
        n_df: gps.basic.n_df,
        resolution: gps.basic.resolution,
        total_duration: gps.basic.total_duration,
        total_length: Some(gps.infos.total_length),
        dmax: Some(gps.infos.dmax),
        n_trip: Some(gps.infos.n_trip),
        n_dives: None,
        nest_longitude: Some(gps.infos.nest_position.longitude),
        nest_latitude: Some(gps.infos.nest_position.latitude),
    }
}

fn tdr_summary(tdr: &Tdr) -> CollectionSummary {
    CollectionSummary {
        group: tdr.group.clone(),
        id: tdr.id.clone(),
        start_datetime: tdr.basic.start_datetime,
        end_datetime: tdr.basic.end_datetime,
        n_df: tdr.basic.n_df,
        resolution: tdr.basic.resolution,
        total_duration: tdr.basic.total_duration,
        total_length: None,
        dmax: None,
        n_trip: None,
        n_dives: Some(tdr.infos.n_dives),
        nest_longitude: None,
        nest_latitude: None,
    }
}

#[derive(Clone, Debug)]
pub struct TdrCollection {
    pub tdr: Vec<Tdr>,
}

impl TdrCollection {
    pub fn new(individuals: Vec<Individual>, params: &Params) -> Result<Self, ForagerError> {
        let tdr = build_all(individuals, |i| Tdr::new(&i.records, &i.group, &i.id, params))?;
        info!(n_individuals = tdr.len(), "tdr collection built");
        Ok(Self { tdr })
    }

    pub fn dive_statistics(&self) -> Vec<CollectionDive> {
        self.tdr.iter().flat_map(dive_rows).collect()
    }

    pub fn summaries(&self) -> Vec<CollectionSummary> {
        self.tdr.iter().map(tdr_summary).collect()
    }

    pub fn n_dives(&self) -> usize {
        self.tdr.iter().map(Tdr::n_dives).sum()
    }
}

#[derive(Clone, Debug)]
pub struct AxyCollection {
    pub axy: Vec<Axy>,
}

impl AxyCollection {
    pub fn new(individuals: Vec<Individual>, params: &Params) -> Result<Self, ForagerError> {
        let axy = build_all(individuals, |i| Axy::new(&i.records, &i.group, &i.id, params))?;
        info!(n_individuals = axy.len(), "axy collection built");
        Ok(Self { axy })
    }

    pub fn trip_statistics(&self) -> Vec<CollectionTrip> {
        self.axy.iter().flat_map(|a| trip_rows(&a.gps)).collect()
    }

    pub fn dive_statistics(&self) -> Vec<CollectionDive> {
        self.axy.iter().flat_map(|a| dive_rows(&a.tdr)).collect()
    }

    pub fn summaries(&self) -> Vec<CollectionSummary> {
        self.axy
            .iter()
            .map(|a| {
                let mut summary = gps_summary(&a.gps);
                summary.start_datetime = a.basic.start_datetime;
                summary.end_datetime = a.basic.end_datetime;
                summary.n_df = a.basic.n_df;
                summary.resolution = a.basic.resolution;
                summary.total_duration = a.basic.total_duration;
                summary.n_dives = Some(a.tdr.infos.n_dives);
                summary
            })
            .collect()
    }
}
