//! Compass-bearing geometry.
//!
//! [`angular_difference`] is the only primitive used to compare the course
//! azimuth with a wind or current bearing.

use crate::{Coordinate, ValidationError};

/// Minimal circular difference between two bearings, in `[0, 180]`.
///
/// Order-independent and tolerant of inputs outside `[0, 360)`.
///
/// ```
/// use rowing_conditions_lib::geometry::angular_difference;
///
/// assert_eq!(angular_difference(315.0, 45.0), 90.0);
/// assert_eq!(angular_difference(10.0, 350.0), 20.0);
/// ```
pub fn angular_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).abs().rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Accept only finite bearings in `[0, 360)`.
pub fn validate_bearing(bearing: f64) -> Result<f64, ValidationError> {
    if bearing.is_finite() && (0.0..360.0).contains(&bearing) {
        Ok(bearing)
    } else {
        Err(ValidationError::InvalidBearing(bearing))
    }
}

/// Fold any finite bearing into `[0, 360)`. Non-finite input is rejected.
pub fn normalize_bearing(bearing: f64) -> Result<f64, ValidationError> {
    if !bearing.is_finite() {
        return Err(ValidationError::InvalidBearing(bearing));
    }
    let folded = bearing.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    Ok(if folded >= 360.0 { 0.0 } else { folded })
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points, in metres.
pub fn haversine_distance_m(from: Coordinate, to: Coordinate) -> f64 {
    let dlat = (to.lat - from.lat).to_radians();
    let dlon = (to.lon - from.lon).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial compass bearing from `from` towards `to`, in `[0, 360)`.
pub fn initial_bearing(from: Coordinate, to: Coordinate) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let dlon = (to.lon - from.lon).to_radians();
    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    let deg = y.atan2(x).to_degrees().rem_euclid(360.0);
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn haversine_one_degree_of_longitude() {
        let dist = haversine_distance_m(
            Coordinate { lat: 0.0, lon: 0.0 },
            Coordinate { lat: 0.0, lon: 1.0 },
        );
        assert!((dist - 111_195.0).abs() < 200.0);
    }

    #[test]
    fn initial_bearing_cardinal_directions() {
        let origin = Coordinate { lat: 0.0, lon: 0.0 };
        let north = initial_bearing(origin, Coordinate { lat: 1.0, lon: 0.0 });
        let east = initial_bearing(origin, Coordinate { lat: 0.0, lon: 1.0 });
        let west = initial_bearing(origin, Coordinate { lat: 0.0, lon: -1.0 });
        assert!(north.abs() < 1e-9);
        assert!((east - 90.0).abs() < 1e-9);
        assert!((west - 270.0).abs() < 1e-9);
    }

    #[test]
    fn reference_course_cases() {
        assert_eq!(angular_difference(315.0, 315.0), 0.0);
        assert_eq!(angular_difference(315.0, 45.0), 90.0);
        assert_eq!(angular_difference(315.0, 135.0), 180.0);
        assert_eq!(angular_difference(0.0, 359.0), 1.0);
    }

    #[test]
    fn out_of_range_inputs_still_fold() {
        assert_eq!(angular_difference(-10.0, 10.0), 20.0);
        assert_eq!(angular_difference(720.0, 90.0), 90.0);
    }

    #[test]
    fn bearing_validation() {
        assert!(validate_bearing(0.0).is_ok());
        assert!(validate_bearing(359.99).is_ok());
        assert!(validate_bearing(360.0).is_err());
        assert!(validate_bearing(-1.0).is_err());
        assert!(validate_bearing(f64::INFINITY).is_err());
    }

    #[test]
    fn bearing_normalization() {
        assert_eq!(normalize_bearing(370.0).unwrap(), 10.0);
        assert_eq!(normalize_bearing(-90.0).unwrap(), 270.0);
        assert!(normalize_bearing(f64::NAN).is_err());
    }

    proptest! {
        #[test]
        fn symmetric_and_bounded(a in 0.0f64..360.0, b in 0.0f64..360.0) {
            let ab = angular_difference(a, b);
            let ba = angular_difference(b, a);
            prop_assert_eq!(ab, ba);
            prop_assert!((0.0..=180.0).contains(&ab));
        }

        #[test]
        fn normalized_bearings_validate(x in -1.0e4f64..1.0e4) {
            let n = normalize_bearing(x).unwrap();
            prop_assert!(validate_bearing(n).is_ok());
        }
    }
}
