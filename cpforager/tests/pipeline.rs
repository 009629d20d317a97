use chrono::{NaiveDate, NaiveDateTime};
use cpforager::{
    aggregate_between_samples, Aggregation, Axy, Gps, GpsCollection, Individual, Params, Position,
    SensorRecord, Table, Tdr,
};

fn at(seconds: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2016, 9, 15)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap()
        + chrono::Duration::seconds(seconds)
}

fn colony_params() -> Params {
    Params::from_json_str(
        r#"{
            "colony": {
                "center": {"longitude": -32.3928, "latitude": -3.8198},
                "box_longitude": [-32.3958, -32.3898],
                "box_latitude": [-3.8226, -3.8170]
            }
        }"#,
    )
    .unwrap()
}

/// Fixes every 5 minutes: one hour at the nest, an excursion of `legs`
/// fixes going north then back, one hour at the nest, repeated `trips` times.
fn foraging_track(trips: usize, legs: usize) -> Vec<SensorRecord> {
    let nest = (-32.3928, -3.8198);
    let mut positions = Vec::new();
    for _ in 0..trips {
        positions.extend(std::iter::repeat(nest).take(12));
        for k in 1..=legs {
            positions.push((nest.0, nest.1 + 0.02 * k as f64));
        }
        for k in (1..legs).rev() {
            positions.push((nest.0, nest.1 + 0.02 * k as f64));
        }
    }
    positions.extend(std::iter::repeat(nest).take(12));
    positions
        .into_iter()
        .enumerate()
        .map(|(i, (lon, lat))| SensorRecord::new(at(i as i64 * 300)).with_position(lon, lat))
        .collect()
}

#[test]
fn gps_pipeline_finds_each_excursion() {
    let records = foraging_track(2, 10);
    let gps = Gps::new(&records, "BRA_FDN_2016_09", "SSUL_01", &colony_params()).unwrap();

    assert_eq!(gps.n_trip(), 2);
    assert_eq!(gps.n_suspicious, 0);
    let nest = gps.infos.nest_position;
    assert!((nest.longitude - -32.3928).abs() < 1e-9);
    assert!((nest.latitude - -3.8198).abs() < 1e-9);

    let stats = &gps.infos.trip_statistics;
    assert_eq!(stats.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2]);
    for trip in stats {
        // 0.2 degree of latitude out and back
        assert!((trip.dmax - 22.26).abs() < 0.05, "dmax {}", trip.dmax);
        assert!(trip.length > 40.0 && trip.length < 50.0);
        assert!(trip.duration > 1.5);
    }

    // trip labels are contiguous and never cover the nest stays
    let labels: Vec<u32> = gps.points.iter().map(|p| p.trip).collect();
    assert!(labels[..11].iter().all(|&t| t == 0));
    assert!(labels[labels.len() - 10..].iter().all(|&t| t == 0));
    let first = labels.iter().position(|&t| t == 1).unwrap();
    let last = labels.iter().rposition(|&t| t == 1).unwrap();
    assert!(labels[first..=last].iter().all(|&t| t == 1));
}

#[test]
fn gps_pipeline_respects_trip_thresholds() {
    let records = foraging_track(1, 10);
    let mut params = colony_params();
    params.trip_min_length = 100.0;
    let gps = Gps::new(&records, "g", "a", &params).unwrap();
    assert_eq!(gps.n_trip(), 0);
    assert!(gps.infos.trip_statistics.is_empty());
    assert!(gps.points.iter().all(|p| p.trip == 0));
}

#[test]
fn gps_pipeline_uses_nest_override() {
    let records = foraging_track(1, 10);
    let mut params = colony_params();
    params.nest_position = Some(Position::new(-32.3928, -3.8198));
    let gps = Gps::new(&records, "g", "a", &params).unwrap();
    assert_eq!(gps.infos.nest_position, Position::new(-32.3928, -3.8198));
    assert_eq!(gps.points[0].dist_to_nest, Some(0.0));
}

#[test]
fn collection_order_does_not_depend_on_input_order() {
    let build = |order: &[&str]| {
        let individuals: Vec<Individual> = order
            .iter()
            .map(|id| Individual::new("2016", *id, foraging_track(1, 8)))
            .collect();
        GpsCollection::new(individuals, &colony_params())
            .unwrap()
            .trip_statistics()
    };
    let forward = build(&["A", "B", "C"]);
    let backward = build(&["C", "B", "A"]);
    assert_eq!(forward, backward);
    assert_eq!(
        forward.iter().map(|t| t.trip_id.as_str()).collect::<Vec<_>>(),
        vec!["2016_A_T0001", "2016_B_T0001", "2016_C_T0001"]
    );
}

#[test]
fn resampling_every_tenth_row() {
    let times: Vec<NaiveDateTime> = (0..100).map(at).collect();
    let x: Vec<f64> = (0..100).map(|i| (i % 7) as f64 * 0.5).collect();
    let table = Table::new(times).with_column("x", x.clone()).unwrap();
    let mask: Vec<bool> = (0..100).map(|i| i % 10 == 9).collect();
    let aggregations = vec![
        ("x".to_string(), Aggregation::Sum),
        ("x".to_string(), Aggregation::Max),
    ];
    let out = aggregate_between_samples(&table, &mask, &aggregations).unwrap();

    let sums: Vec<f64> = out
        .column("x_sum")
        .unwrap()
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .collect();
    assert_eq!(sums.len(), 10);
    let total: f64 = x.iter().sum();
    assert!((sums.iter().sum::<f64>() - total).abs() < 1e-9);
    assert_eq!(out.column("x_max").unwrap()[9], 3.0);
    // source columns are untouched
    assert_eq!(out.column("x").unwrap().to_vec(), x);
}

#[test]
fn tdr_pipeline_on_a_dive_bout() {
    let metre = 1023.6 * 9.80665 / 100.0;
    let mut depths = vec![0.0; 30];
    depths[5..12].copy_from_slice(&[1.0, 3.0, 6.0, 8.0, 6.0, 3.0, 1.0]);
    depths[20] = 2.5; // a single sample is too short to count
    let records: Vec<SensorRecord> = depths
        .iter()
        .enumerate()
        .map(|(i, d)| SensorRecord::new(at(i as i64)).with_tdr(1012.0 + d * metre, 24.0))
        .collect();
    let tdr = Tdr::new(&records, "g", "a", &colony_params()).unwrap();
    assert_eq!(tdr.n_dives(), 1);
    let dive = &tdr.infos.dive_statistics[0];
    assert_eq!(dive.n_step, 5);
    assert_eq!(dive.duration, 4.0);
    assert!((dive.max_depth - 8.0).abs() < 1e-9);
    assert_eq!(tdr.points[20].dive, 0);
    assert!(tdr.points[20].is_diving);
}

#[test]
fn axy_pipeline_aligns_gps_rows() {
    let track = foraging_track(1, 6);
    let hz = 4;
    let mut records = Vec::new();
    for (k, fix) in track.iter().enumerate() {
        // 300 s between fixes sampled at 4 Hz, the fix closes each block
        for s in 0..300 * hz {
            let t = (k as i64 * 300 - 300) * 1000 + (s as i64 + 1) * 1000 / hz as i64;
            if t < 0 {
                continue;
            }
            let timestamp = at(0) + chrono::Duration::milliseconds(t);
            let mut record = SensorRecord::new(timestamp).with_acceleration(0.1, -0.2, 1.0);
            if s == 300 * hz - 1 {
                record.longitude = fix.longitude;
                record.latitude = fix.latitude;
            }
            if s % hz == 0 {
                record = record.with_tdr(1012.0, 24.0);
            }
            records.push(record);
        }
    }
    let axy = Axy::new(&records, "g", "a", &colony_params()).unwrap();
    assert_eq!(axy.gps_table.len(), track.len());
    assert_eq!(axy.gps.n_trip(), 1);
    assert_eq!(axy.tdr.n_dives(), 0);
    assert!((axy.frequency() - 4.0).abs() < 1e-9);
    let odba = axy.gps_table.require("odba").unwrap();
    // 1200 samples of |0.1| + |-0.2| + |1.0| per fix after the first
    assert!((odba[1] - 1560.0).abs() < 1e-6);
}
