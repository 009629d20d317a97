//! Spherical-earth distance and heading.

use ndarray::{Array1, ArrayView1, Zip};

use crate::{ForagerError, Position};

const R_EARTH_EQUATORIAL_KM: f64 = 6378.137;
const R_EARTH_POLAR_KM: f64 = 6356.752;

/// Earth radius in km at the given latitude (radians).
fn earth_radius_at(lat_rad: f64) -> f64 {
    let (a, b) = (R_EARTH_EQUATORIAL_KM, R_EARTH_POLAR_KM);
    let (sin, cos) = lat_rad.sin_cos();
    let num = (a * a * cos).powi(2) + (b * b * sin).powi(2);
    let den = (a * cos).powi(2) + (b * sin).powi(2);
    (num / den).sqrt()
}

/// Haversine great-circle distance in km, radius taken at the mean latitude.
pub fn ortho_distance(lon_1: f64, lat_1: f64, lon_2: f64, lat_2: f64) -> f64 {
    let (lat_1, lat_2) = (lat_1.to_radians(), lat_2.to_radians());
    let (lon_1, lon_2) = (lon_1.to_radians(), lon_2.to_radians());
    let r = earth_radius_at((lat_1 + lat_2) / 2.0);

    let dlat = lat_2 - lat_1;
    let dlon = lon_2 - lon_1;
    let a = (dlat / 2.0).sin().powi(2) + lat_1.cos() * lat_2.cos() * (dlon / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    r * c
}

/// Bearing in degrees from point 1 to point 2 (N=0, E=90), within [0, 360).
pub fn spherical_heading(lon_1: f64, lat_1: f64, lon_2: f64, lat_2: f64) -> f64 {
    let (lat_1, lat_2) = (lat_1.to_radians(), lat_2.to_radians());
    let dlon = (lon_2 - lon_1).to_radians();
    let a = lat_1.cos() * lat_2.sin() - lat_1.sin() * lat_2.cos() * dlon.cos();
    let b = dlon.sin() * lat_2.cos();
    let heading = b.atan2(a).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative angles
    if heading >= 360.0 {
        0.0
    } else {
        heading
    }
}

fn check_lengths(columns: [(&str, usize); 4]) -> Result<(), ForagerError> {
    let expected = columns[0].1;
    for (name, len) in columns {
        if len != expected {
            return Err(ForagerError::LengthMismatch {
                column: name.to_string(),
                expected,
                actual: len,
            });
        }
    }
    Ok(())
}

/// Elementwise [`ortho_distance`] over equal-length arrays.
pub fn ortho_distances(
    lon_1: ArrayView1<f64>,
    lat_1: ArrayView1<f64>,
    lon_2: ArrayView1<f64>,
    lat_2: ArrayView1<f64>,
) -> Result<Array1<f64>, ForagerError> {
    check_lengths([
        ("lon_1", lon_1.len()),
        ("lat_1", lat_1.len()),
        ("lon_2", lon_2.len()),
        ("lat_2", lat_2.len()),
    ])?;
    Ok(Zip::from(&lon_1)
        .and(&lat_1)
        .and(&lon_2)
        .and(&lat_2)
        .map_collect(|&a, &b, &c, &d| ortho_distance(a, b, c, d)))
}

/// Elementwise [`spherical_heading`] over equal-length arrays.
pub fn spherical_headings(
    lon_1: ArrayView1<f64>,
    lat_1: ArrayView1<f64>,
    lon_2: ArrayView1<f64>,
    lat_2: ArrayView1<f64>,
) -> Result<Array1<f64>, ForagerError> {
    check_lengths([
        ("lon_1", lon_1.len()),
        ("lat_1", lat_1.len()),
        ("lon_2", lon_2.len()),
        ("lat_2", lat_2.len()),
    ])?;
    Ok(Zip::from(&lon_1)
        .and(&lat_1)
        .and(&lon_2)
        .and(&lat_2)
        .map_collect(|&a, &b, &c, &d| spherical_heading(a, b, c, d)))
}

/// Distance in km from every position to `reference`.
pub fn distances_to(lon: &[f64], lat: &[f64], reference: Position) -> Array1<f64> {
    lon.iter()
        .zip(lat)
        .map(|(&x, &y)| ortho_distance(x, y, reference.longitude, reference.latitude))
        .collect()
}

/// Heading in degrees from `reference` to every position.
pub fn headings_from(reference: Position, lon: &[f64], lat: &[f64]) -> Array1<f64> {
    lon.iter()
        .zip(lat)
        .map(|(&x, &y)| spherical_heading(reference.longitude, reference.latitude, x, y))
        .collect()
}
