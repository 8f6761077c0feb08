//! Great-circle distance, the single geodesic primitive used across the engine.

use geo::{Distance as _, Haversine, geometry::Point};
use time::Duration;

/// Anything that has a latitude/longitude position in degrees.
pub trait Positioned {
    fn lat(&self) -> f64;
    fn lon(&self) -> f64;

    fn point(&self) -> Point<f64> {
        Point::new(self.lon(), self.lat())
    }
}

impl Positioned for (f64, f64) {
    fn lat(&self) -> f64 {
        self.0
    }

    fn lon(&self) -> f64 {
        self.1
    }
}

/// Haversine distance between two positions, in kilometers.
///
/// NaN coordinates propagate to a NaN result.
pub fn distance(a: &impl Positioned, b: &impl Positioned) -> f64 {
    Haversine.distance(a.point(), b.point()) / 1000.0
}

/// Haversine distance between two raw lat/lon pairs, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    distance(&(lat1, lon1), &(lat2, lon2))
}

/// Speed in km/h for a distance covered over an interval.
///
/// Returns `None` when the interval is not strictly positive.
pub fn speed_kmh(distance_km: f64, elapsed: Duration) -> Option<f64> {
    let hours = elapsed.as_seconds_f64() / 3600.0;
    (hours > 0.0).then(|| distance_km / hours)
}

/// Pace in minutes per kilometer; zero when no distance was covered.
pub fn pace_min_per_km(elapsed: Duration, distance_km: f64) -> f64 {
    if distance_km > 0.0 {
        elapsed.as_seconds_f64() / 60.0 / distance_km
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_degree_latitude() {
        // ~111km for 1 degree of latitude
        let dist = haversine_km(0.0, 0.0, 1.0, 0.0);
        assert!((dist - 111.19).abs() < 0.1);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = (40.015, -105.2705);
        let b = (40.025, -105.2605);
        assert!((distance(&a, &b) - distance(&b, &a)).abs() < 1e-12);
        assert_eq!(distance(&a, &a), 0.0);
    }

    #[test]
    fn test_nan_propagates() {
        assert!(haversine_km(f64::NAN, 0.0, 1.0, 0.0).is_nan());
    }

    #[test]
    fn test_speed_requires_positive_interval() {
        assert_eq!(speed_kmh(1.0, Duration::ZERO), None);
        let speed = speed_kmh(1.0, Duration::minutes(6)).unwrap();
        assert!((speed - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_pace_guards_zero_distance() {
        assert_eq!(pace_min_per_km(Duration::minutes(5), 0.0), 0.0);
        assert!((pace_min_per_km(Duration::minutes(25), 5.0) - 5.0).abs() < 1e-9);
    }
}
