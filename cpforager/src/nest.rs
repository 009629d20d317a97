use tracing::{debug, warn};

use crate::stats::median;
use crate::{Colony, Position};

/// Estimate the nest as the median position of slow samples inside the colony box.
///
/// Falls back to every sample inside the box, then to the declared colony
/// centre. An explicit `nest_position` bypasses the estimation.
pub fn estimate_nest_position(
    lon: &[f64],
    lat: &[f64],
    step_speed: &[f64],
    colony: &Colony,
    nesting_speed: f64,
    nest_position: Option<Position>,
) -> Position {
    if let Some(position) = nest_position {
        return position;
    }

    let at_colony: Vec<bool> = lon
        .iter()
        .zip(lat)
        .map(|(&x, &y)| colony.contains(x, y))
        .collect();
    let at_nest: Vec<bool> = at_colony
        .iter()
        .zip(step_speed)
        .map(|(&inside, &speed)| inside && speed < nesting_speed)
        .collect();

    if let Some(position) = median_position(lon, lat, &at_nest) {
        debug!(
            "nest estimated from {} slow samples",
            at_nest.iter().filter(|&&m| m).count()
        );
        return position;
    }
    if let Some(position) = median_position(lon, lat, &at_colony) {
        debug!("no slow sample inside the colony, nest estimated from all colony samples");
        return position;
    }

    warn!(
        "cannot estimate a nest position, took the colony position ({:.5}, {:.5}) instead",
        colony.center.longitude, colony.center.latitude
    );
    colony.center
}

fn median_position(lon: &[f64], lat: &[f64], mask: &[bool]) -> Option<Position> {
    let pick = |values: &[f64]| {
        median(
            values
                .iter()
                .zip(mask)
                .filter_map(|(&v, &m)| if m { Some(v) } else { None }),
        )
    };
    Some(Position::new(pick(lon)?, pick(lat)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colony() -> Colony {
        Colony {
            center: Position::new(-32.3928, -3.8198),
            box_longitude: (-32.3958, -32.3898),
            box_latitude: (-3.8226, -3.8170),
        }
    }

    #[test]
    fn test_override_is_returned_unchanged() {
        let forced = Position::new(1.0, 2.0);
        let nest = estimate_nest_position(&[], &[], &[], &colony(), 1.0, Some(forced));
        assert_eq!(nest, forced);
    }

    #[test]
    fn test_median_of_slow_samples_in_box() {
        let lon = [-32.3950, -32.3940, -32.3930, -32.3920, -31.0];
        let lat = [-3.8200, -3.8190, -3.8180, -3.8175, -3.0];
        // the fastest in-box sample is ignored
        let speed = [f64::NAN, 0.2, 0.5, 30.0, 0.1];
        let nest = estimate_nest_position(&lon, &lat, &speed, &colony(), 1.0, None);
        assert!((nest.longitude - (-32.3935)).abs() < 1e-12);
        assert!((nest.latitude - (-3.8185)).abs() < 1e-12);
    }

    #[test]
    fn test_falls_back_to_box_then_center() {
        let lon = [-32.3950, -32.3930, -31.0];
        let lat = [-3.8200, -3.8180, -3.0];
        let speed = [f64::NAN, 12.0, 0.1];
        let nest = estimate_nest_position(&lon, &lat, &speed, &colony(), 1.0, None);
        assert!((nest.longitude - (-32.3940)).abs() < 1e-12);

        let nest = estimate_nest_position(&[-31.0], &[-3.0], &[0.0], &colony(), 1.0, None);
        assert_eq!(nest, colony().center);
    }
}
