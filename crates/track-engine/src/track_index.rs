//! Distance- and time-addressable access to a track's point sequence.
//!
//! [`recompute_metrics`] is the only place cumulative distances are written.
//! Lookups binary-search the non-decreasing cumulative distances (or
//! timestamps) and linearly interpolate every per-point field between the
//! bracketing pair with a single ratio.

use time::{Duration, OffsetDateTime};

use crate::{
    geometry,
    models::{Track, TrackPoint},
};

/// Two cumulative distances closer than this (in km) address the same place.
pub const DISTANCE_EPSILON: f64 = 1e-9;

/// Output of [`recompute_metrics`].
#[derive(Debug, Clone)]
pub struct RecomputedMetrics {
    pub points: Vec<TrackPoint>,
    /// Kilometers.
    pub total_distance: f64,
    pub total_duration: Duration,
}

/// Rebuilds every point's cumulative distance from scratch.
///
/// Sequences with fewer than two points report zero distance and duration.
pub fn recompute_metrics(mut points: Vec<TrackPoint>) -> RecomputedMetrics {
    let mut cumulative = 0.0;
    for i in 0..points.len() {
        if i > 0 {
            cumulative += geometry::distance(&points[i - 1], &points[i]);
        }
        points[i].cumulative_distance = cumulative;
    }

    let (total_distance, total_duration) = match (points.first(), points.last()) {
        (Some(first), Some(last)) if points.len() >= 2 => {
            (cumulative, last.timestamp - first.timestamp)
        }
        _ => (0.0, Duration::ZERO),
    };

    RecomputedMetrics {
        points,
        total_distance,
        total_duration,
    }
}

/// Linear interpolation between two points by ratio `r` in `[0, 1]`.
///
/// Position, elevation, timestamp, and cumulative distance are blended with
/// the same ratio. Sensor values are blended when both sides carry one and
/// otherwise taken from whichever side has a sample.
pub fn interpolate(p1: &TrackPoint, p2: &TrackPoint, r: f64) -> TrackPoint {
    TrackPoint {
        lat: lerp(p1.lat, p2.lat, r),
        lon: lerp(p1.lon, p2.lon, r),
        elevation: lerp(p1.elevation, p2.elevation, r),
        timestamp: p1.timestamp + (p2.timestamp - p1.timestamp) * r,
        cumulative_distance: lerp(p1.cumulative_distance, p2.cumulative_distance, r),
        heart_rate: lerp_sample(p1.heart_rate, p2.heart_rate, r),
        cadence: lerp_sample(p1.cadence, p2.cadence, r),
    }
}

fn lerp(a: f64, b: f64, r: f64) -> f64 {
    a + (b - a) * r
}

fn lerp_sample(a: Option<i32>, b: Option<i32>, r: f64) -> Option<i32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(lerp(a as f64, b as f64, r).round() as i32),
        (a, b) => a.or(b),
    }
}

/// The point `d` kilometers from the start of the track.
///
/// Returns `None` when `d` is negative, not finite, or beyond the track's
/// total distance.
pub fn point_at_distance(track: &Track, d: f64) -> Option<TrackPoint> {
    if !d.is_finite() || d < 0.0 || d > track.total_distance() {
        return None;
    }

    let points = track.points();
    let idx = points.partition_point(|p| p.cumulative_distance < d);
    let p2 = points.get(idx)?;
    if idx == 0 || (p2.cumulative_distance - d).abs() <= DISTANCE_EPSILON {
        return Some(*p2);
    }

    let p1 = &points[idx - 1];
    if (d - p1.cumulative_distance).abs() <= DISTANCE_EPSILON {
        return Some(*p1);
    }

    let span = p2.cumulative_distance - p1.cumulative_distance;
    if span <= 0.0 {
        return Some(*p1);
    }

    Some(interpolate(p1, p2, (d - p1.cumulative_distance) / span))
}

/// The point `elapsed` after the track's first timestamp.
///
/// Uses the same interpolation law as [`point_at_distance`], driven by time
/// instead of distance. Returns `None` for negative elapsed time or beyond the
/// track's total duration.
pub fn point_at_time(track: &Track, elapsed: Duration) -> Option<TrackPoint> {
    if elapsed.is_negative() || elapsed > track.total_duration() {
        return None;
    }

    let start = track.start_time()?;
    point_at_timestamp(track.points(), start + elapsed)
}

fn point_at_timestamp(points: &[TrackPoint], target: OffsetDateTime) -> Option<TrackPoint> {
    let idx = points.partition_point(|p| p.timestamp < target);
    let p2 = points.get(idx)?;
    if idx == 0 || p2.timestamp == target {
        return Some(*p2);
    }

    let p1 = &points[idx - 1];
    let span = (p2.timestamp - p1.timestamp).as_seconds_f64();
    if span <= 0.0 {
        return Some(*p1);
    }

    let r = (target - p1.timestamp).as_seconds_f64() / span;
    Some(interpolate(p1, p2, r))
}

/// The contiguous sub-sequence covering `[start, end]` kilometers.
///
/// Consists of the point at `start`, every recorded point in between, and
/// the point at `end`. Boundaries are interpolated only when no recorded point
/// sits on them. The range is clamped to the track; an inverted range yields
/// an empty sequence.
pub fn points_in_range(track: &Track, start: f64, end: f64) -> Vec<TrackPoint> {
    if track.is_empty() || !start.is_finite() || !end.is_finite() {
        return Vec::new();
    }

    let total = track.total_distance();
    let start = start.clamp(0.0, total);
    let end = end.clamp(0.0, total);
    if start > end {
        return Vec::new();
    }

    let points = track.points();
    let lo = points.partition_point(|p| p.cumulative_distance < start - DISTANCE_EPSILON);
    let hi = points.partition_point(|p| p.cumulative_distance <= end + DISTANCE_EPSILON);

    let mut out = Vec::with_capacity(hi.saturating_sub(lo) + 2);

    let start_on_record =
        lo < hi && points[lo].cumulative_distance - start <= DISTANCE_EPSILON;
    if !start_on_record && let Some(p) = point_at_distance(track, start) {
        out.push(p);
    }

    if lo < hi {
        out.extend_from_slice(&points[lo..hi]);
    }

    let end_on_record = out
        .last()
        .is_some_and(|p| (end - p.cumulative_distance).abs() <= DISTANCE_EPSILON);
    if !end_on_record && let Some(p) = point_at_distance(track, end) {
        out.push(p);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn start() -> OffsetDateTime {
        datetime!(2024-05-01 07:00 UTC)
    }

    /// Heads north along the prime meridian at a steady pace, one point per minute.
    fn straight_track(n: usize) -> Track {
        let points = (0..n)
            .map(|i| {
                TrackPoint::new(
                    i as f64 * 0.01,
                    0.0,
                    100.0 + i as f64 * 10.0,
                    start() + Duration::minutes(i as i64),
                )
                .with_heart_rate(140 + i as i32 * 2)
            })
            .collect();
        Track::new("Straight", "#ff0000", points)
    }

    #[test]
    fn test_cumulative_distance_is_monotonic() {
        let track = straight_track(6);
        let points = track.points();

        assert_eq!(points[0].cumulative_distance, 0.0);
        for window in points.windows(2) {
            assert!(window[1].cumulative_distance >= window[0].cumulative_distance);
        }
        assert_eq!(
            points.last().unwrap().cumulative_distance,
            track.total_distance()
        );
        assert_eq!(track.total_duration(), Duration::minutes(5));
    }

    #[test]
    fn test_recompute_overwrites_stale_distances() {
        let mut points = straight_track(3).points().to_vec();
        for p in &mut points {
            p.cumulative_distance = 999.0;
        }
        let recomputed = recompute_metrics(points);
        assert_eq!(recomputed.points[0].cumulative_distance, 0.0);
        assert!((recomputed.total_distance - 2.224).abs() < 0.01);
    }

    #[test]
    fn test_point_at_recorded_distance_is_identity() {
        let track = straight_track(5);
        for p in track.points() {
            let found = point_at_distance(&track, p.cumulative_distance).unwrap();
            assert!((found.lat - p.lat).abs() < 1e-9);
            assert!((found.elevation - p.elevation).abs() < 1e-9);
            assert_eq!(found.timestamp, p.timestamp);
        }
    }

    #[test]
    fn test_point_at_distance_interpolates_midpoint() {
        let track = straight_track(3);
        let p1 = track.points()[1];
        let p2 = track.points()[2];
        let mid = (p1.cumulative_distance + p2.cumulative_distance) / 2.0;

        let found = point_at_distance(&track, mid).unwrap();

        assert!((found.lat - 0.015).abs() < 1e-6);
        assert!((found.elevation - 115.0).abs() < 1e-6);
        let expected = start() + Duration::seconds(90);
        assert!((found.timestamp - expected).abs() < Duration::milliseconds(1));
        assert_eq!(found.heart_rate, Some(143));
    }

    #[test]
    fn test_point_at_distance_out_of_range() {
        let track = straight_track(3);
        assert!(point_at_distance(&track, -0.1).is_none());
        assert!(point_at_distance(&track, track.total_distance() + 0.1).is_none());
        assert!(point_at_distance(&track, f64::NAN).is_none());
    }

    #[test]
    fn test_zero_length_segment_returns_first_point() {
        let points = vec![
            TrackPoint::new(0.0, 0.0, 0.0, start()),
            TrackPoint::new(0.0, 0.0, 0.0, start() + Duration::seconds(30)),
        ];
        let track = Track::new("Standing", "#000000", points);
        let found = point_at_distance(&track, 0.0).unwrap();
        assert_eq!(found.timestamp, start());
    }

    #[test]
    fn test_point_at_time_agrees_with_distance() {
        let track = straight_track(4);
        let by_time = point_at_time(&track, Duration::seconds(150)).unwrap();
        let by_distance = point_at_distance(&track, by_time.cumulative_distance).unwrap();

        assert!((by_time.lat - by_distance.lat).abs() < 1e-9);
        assert!((by_time.lat - 0.025).abs() < 1e-9);
        assert!((by_time.timestamp - by_distance.timestamp).abs() < Duration::milliseconds(1));
    }

    #[test]
    fn test_point_at_time_out_of_range() {
        let track = straight_track(3);
        assert!(point_at_time(&track, Duration::seconds(-1)).is_none());
        assert!(point_at_time(&track, Duration::minutes(3)).is_none());
        assert!(point_at_time(&track, Duration::minutes(2)).is_some());
    }

    #[test]
    fn test_points_in_range_interpolates_boundaries() {
        let track = straight_track(5);
        let d1 = track.points()[1].cumulative_distance;
        let d3 = track.points()[3].cumulative_distance;
        let start_d = d1 / 2.0;
        let end_d = (d3 + track.points()[4].cumulative_distance) / 2.0;

        let range = points_in_range(&track, start_d, end_d);

        assert_eq!(range.len(), 5);
        assert!((range[0].cumulative_distance - start_d).abs() < 1e-9);
        assert!((range[1].cumulative_distance - d1).abs() < 1e-12);
        assert!((range[3].cumulative_distance - d3).abs() < 1e-12);
        assert!((range[4].cumulative_distance - end_d).abs() < 1e-9);
    }

    #[test]
    fn test_points_in_range_whole_track_is_exact() {
        let track = straight_track(4);
        let range = points_in_range(&track, 0.0, track.total_distance());
        assert_eq!(range, track.points());
    }

    #[test]
    fn test_points_in_range_inverted_is_empty() {
        let track = straight_track(4);
        assert!(points_in_range(&track, 2.0, 1.0).is_empty());
    }
}
