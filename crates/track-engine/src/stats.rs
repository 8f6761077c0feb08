//! Derived performance statistics: totals, pace, elevation, pauses, and splits.
//!
//! Statistics are never stored. They are a pure function of a [`Track`], a
//! smoothing window, and an [`EngineConfig`], and are recomputed whenever the
//! track changes.

use rayon::prelude::*;
use serde::Serialize;
use time::Duration;
use tracing::{debug, warn};

use crate::{
    config::{EngineConfig, PauseConfig, SplitConfig},
    editing,
    geometry::{self, pace_min_per_km, speed_kmh},
    metrics::{ElevationMetric, PointMetrics, SensorMetric, score_points},
    models::{Track, TrackPoint},
    track_index::{self, interpolate},
};

/// One distance bucket of a track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Split {
    pub index: usize,
    /// Kilometers covered in this bucket.
    pub distance: f64,
    pub duration: Duration,
    /// Minutes per kilometer.
    pub pace: f64,
    pub elevation_gain: f64,
    pub elevation_loss: f64,
    pub avg_heart_rate: Option<f64>,
    pub is_fastest: bool,
    pub is_slowest: bool,
}

/// A maximal run of near-zero speed lasting at least the configured minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PauseSegment {
    /// Index of the first point of the stopped run.
    pub start_point: usize,
    /// Index of the last point of the stopped run.
    pub end_point: usize,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackStats {
    /// Kilometers.
    pub total_distance: f64,
    pub total_duration: Duration,
    pub moving_duration: Duration,
    /// Meters.
    pub elevation_gain: f64,
    /// Meters.
    pub elevation_loss: f64,
    pub min_elevation: f64,
    pub max_elevation: f64,
    /// Minutes per kilometer over the total duration.
    pub avg_pace: f64,
    /// Minutes per kilometer over the moving duration.
    pub moving_pace: f64,
    /// km/h over the total duration.
    pub avg_speed: f64,
    /// km/h over the moving duration.
    pub moving_speed: f64,
    /// km/h, capped at the configured ceiling.
    pub max_speed: f64,
    pub min_heart_rate: Option<i32>,
    pub avg_heart_rate: Option<f64>,
    pub max_heart_rate: Option<i32>,
    pub avg_cadence: Option<f64>,
    pub splits: Vec<Split>,
    pub pauses: Vec<PauseSegment>,
}

/// Computes statistics with the default configuration.
///
/// `smoothing_window` is the size of the centered moving average applied to
/// position and elevation first; 0 or 1 disables smoothing.
pub fn compute_stats(track: &Track, smoothing_window: usize) -> TrackStats {
    compute_stats_with(track, smoothing_window, &EngineConfig::default())
}

pub fn compute_stats_with(
    track: &Track,
    smoothing_window: usize,
    config: &EngineConfig,
) -> TrackStats {
    if track.is_degenerate() {
        return TrackStats::default();
    }

    let smoothed = track_index::recompute_metrics(smooth_points(track.points(), smoothing_window));
    let points = &smoothed.points;
    let total_distance = smoothed.total_distance;
    let total_duration = smoothed.total_duration;

    let pauses = find_pauses_with(points, &config.pause);
    let paused: f64 = pauses.iter().map(|p| p.duration_seconds).sum();
    let moving_duration = (total_duration - Duration::seconds_f64(paused)).max(Duration::ZERO);

    let scores = score_points(PointMetrics::new(), points);
    let splits = compute_splits(points, &config.splits);

    debug!(
        points = points.len(),
        pauses = pauses.len(),
        splits = splits.len(),
        "Computed track statistics"
    );

    TrackStats {
        total_distance,
        total_duration,
        moving_duration,
        elevation_gain: scores.elevation.gain,
        elevation_loss: scores.elevation.loss,
        min_elevation: scores.elevation.min,
        max_elevation: scores.elevation.max,
        avg_pace: pace_min_per_km(total_duration, total_distance),
        moving_pace: pace_min_per_km(moving_duration, total_distance),
        avg_speed: speed_kmh(total_distance, total_duration).unwrap_or(0.0),
        moving_speed: speed_kmh(total_distance, moving_duration).unwrap_or(0.0),
        max_speed: max_speed(points, smoothing_window, config.max_speed_cap_kmh),
        min_heart_rate: scores.heart_rate.map(|hr| hr.min),
        avg_heart_rate: scores.heart_rate.map(|hr| hr.avg),
        max_heart_rate: scores.heart_rate.map(|hr| hr.max),
        avg_cadence: scores.cadence.map(|c| c.avg),
        splits,
        pauses,
    }
}

/// Statistics for the `[start, end]` kilometer range of a track.
///
/// An invalid range yields zeroed statistics.
pub fn segment_stats(track: &Track, start: f64, end: f64, smoothing_window: usize) -> TrackStats {
    if !(start < end) || start < 0.0 || end > track.total_distance() {
        return TrackStats::default();
    }
    compute_stats(&editing::trim(track, start, end), smoothing_window)
}

/// Computes statistics for many tracks in parallel.
pub fn compute_stats_batch(
    tracks: &[Track],
    smoothing_window: usize,
    config: &EngineConfig,
) -> Vec<TrackStats> {
    tracks
        .par_iter()
        .map(|track| compute_stats_with(track, smoothing_window, config))
        .collect()
}

/// Centered moving average over latitude, longitude, and elevation.
///
/// Even windows are widened by one so the window stays centered; the window
/// is clipped at both ends of the sequence. Timestamps and sensor values are
/// left untouched.
pub fn smooth_points(points: &[TrackPoint], window: usize) -> Vec<TrackPoint> {
    if window <= 1 || points.len() < 3 {
        return points.to_vec();
    }

    let half = window / 2;
    let n = points.len();

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n - 1);
            let span = &points[lo..=hi];
            let count = span.len() as f64;
            TrackPoint {
                lat: span.iter().map(|p| p.lat).sum::<f64>() / count,
                lon: span.iter().map(|p| p.lon).sum::<f64>() / count,
                elevation: span.iter().map(|p| p.elevation).sum::<f64>() / count,
                ..points[i]
            }
        })
        .collect()
}

/// Detects pauses on a track with the default thresholds.
pub fn find_pauses(track: &Track) -> Vec<PauseSegment> {
    find_pauses_with(track.points(), &PauseConfig::default())
}

/// Detects maximal runs of segments slower than the pause threshold.
///
/// A segment with no positive time delta has no speed and ends the current run.
pub fn find_pauses_with(points: &[TrackPoint], config: &PauseConfig) -> Vec<PauseSegment> {
    let mut pauses = Vec::new();
    let mut run_start: Option<usize> = None;

    let close = |start: usize, end: usize, pauses: &mut Vec<PauseSegment>| {
        let duration_seconds = (points[end].timestamp - points[start].timestamp).as_seconds_f64();
        if duration_seconds >= config.min_duration_secs {
            pauses.push(PauseSegment {
                start_point: start,
                end_point: end,
                duration_seconds,
            });
        }
    };

    for i in 1..points.len() {
        let slow = segment_speed(&points[i - 1], &points[i])
            .is_some_and(|speed| speed < config.speed_threshold_kmh);
        if slow {
            run_start.get_or_insert(i - 1);
        } else if let Some(start) = run_start.take() {
            close(start, i - 1, &mut pauses);
        }
    }

    if let Some(start) = run_start {
        close(start, points.len() - 1, &mut pauses);
    }

    pauses
}

fn segment_speed(a: &TrackPoint, b: &TrackPoint) -> Option<f64> {
    speed_kmh(geometry::distance(a, b), b.timestamp - a.timestamp)
}

/// Highest per-point speed, measured across the local smoothing window.
fn max_speed(points: &[TrackPoint], smoothing_window: usize, cap_kmh: f64) -> f64 {
    let half = (smoothing_window / 2).max(1);
    let n = points.len();

    (0..n)
        .filter_map(|i| {
            let a = &points[i.saturating_sub(half)];
            let b = &points[(i + half).min(n - 1)];
            speed_kmh(
                b.cumulative_distance - a.cumulative_distance,
                b.timestamp - a.timestamp,
            )
        })
        .fold(0.0, f64::max)
        .min(cap_kmh)
}

/// Splits a point sequence into fixed-distance buckets in a single pass.
///
/// Bucket boundaries are interpolated between the recorded points that
/// straddle them. The trailing partial bucket is kept only when it covers more
/// than the materiality fraction of a bucket.
pub fn compute_splits(points: &[TrackPoint], config: &SplitConfig) -> Vec<Split> {
    let mut splits = Vec::new();
    let Some(&first) = points.first() else {
        return splits;
    };

    let bucket_km = config.bucket_km;
    if !(bucket_km.is_finite() && bucket_km > 0.0) {
        warn!(bucket_km, "Split bucket must be positive; no splits computed");
        return splits;
    }
    let mut boundary = first.cumulative_distance + bucket_km;
    let mut bucket = vec![first];
    let mut prev = first;

    for point in &points[1..] {
        while point.cumulative_distance >= boundary {
            let r = (boundary - prev.cumulative_distance)
                / (point.cumulative_distance - prev.cumulative_distance);
            let crossing = interpolate(&prev, point, r);
            bucket.push(crossing);
            splits.push(build_split(splits.len(), &bucket));

            bucket = vec![crossing];
            prev = crossing;
            boundary += bucket_km;
        }
        bucket.push(*point);
        prev = *point;
    }

    if let (Some(start), Some(end)) = (bucket.first(), bucket.last()) {
        let remaining = end.cumulative_distance - start.cumulative_distance;
        if bucket.len() >= 2 && remaining > bucket_km * config.materiality_fraction {
            splits.push(build_split(splits.len(), &bucket));
        }
    }

    flag_extremes(&mut splits, bucket_km * config.ranking_fraction);
    splits
}

fn build_split(index: usize, points: &[TrackPoint]) -> Split {
    let (first, last) = (points[0], points[points.len() - 1]);
    let distance = last.cumulative_distance - first.cumulative_distance;
    let duration = last.timestamp - first.timestamp;
    let elevation = score_points(ElevationMetric::default(), points);
    let heart_rate = score_points(SensorMetric::heart_rate(), points);

    Split {
        index,
        distance,
        duration,
        pace: pace_min_per_km(duration, distance),
        elevation_gain: elevation.gain,
        elevation_loss: elevation.loss,
        avg_heart_rate: heart_rate.map(|hr| hr.avg),
        is_fastest: false,
        is_slowest: false,
    }
}

/// Marks the fastest and slowest bucket among those longer than `min_distance`.
///
/// Ties go to the first occurrence. Nothing is marked unless at least two
/// buckets qualify.
fn flag_extremes(splits: &mut [Split], min_distance: f64) {
    let eligible: Vec<usize> = splits
        .iter()
        .filter(|s| s.distance > min_distance)
        .map(|s| s.index)
        .collect();
    if eligible.len() < 2 {
        return;
    }

    let mut fastest = eligible[0];
    let mut slowest = eligible[0];
    for &i in &eligible[1..] {
        if splits[i].pace < splits[fastest].pace {
            fastest = i;
        }
        if splits[i].pace > splits[slowest].pace {
            slowest = i;
        }
    }

    splits[fastest].is_fastest = true;
    splits[slowest].is_slowest = true;
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::{OffsetDateTime, macros::datetime};

    fn start() -> OffsetDateTime {
        datetime!(2024-05-01 07:00 UTC)
    }

    fn assert_close(a: f64, b: f64, tol: f64) {
        assert!((a - b).abs() < tol, "{a} != {b} (tolerance {tol})");
    }

    /// Builds a track from (latitude, seconds, elevation) samples on the prime meridian.
    fn track_from(samples: &[(f64, i64, f64)]) -> Track {
        let points = samples
            .iter()
            .map(|&(lat, secs, elevation)| {
                TrackPoint::new(lat, 0.0, elevation, start() + Duration::seconds(secs))
            })
            .collect();
        Track::new("Test", "#ff0000", points)
    }

    #[test]
    fn test_two_point_track() {
        let track = track_from(&[(0.0, 0, 0.0), (0.01, 60, 0.0)]);
        let stats = compute_stats(&track, 0);

        assert_close(stats.total_distance, 1.11, 0.01);
        assert_eq!(stats.total_duration, Duration::milliseconds(60_000));
        assert_close(stats.avg_pace, 0.9, 0.01);
        assert_eq!(stats.moving_duration, stats.total_duration);
        assert!(stats.pauses.is_empty());
        assert_eq!(stats.max_speed, 60.0);
    }

    #[test]
    fn test_degenerate_track_has_zeroed_stats() {
        let track = track_from(&[(0.0, 0, 0.0)]);
        assert_eq!(compute_stats(&track, 0), TrackStats::default());
        assert_eq!(compute_stats(&track_from(&[]), 5), TrackStats::default());
    }

    #[test]
    fn test_pause_reduces_moving_time() {
        // ~12 km/h with a 30 second stop in the middle.
        let track = track_from(&[
            (0.0, 0, 0.0),
            (0.0003, 10, 0.0),
            (0.0006, 20, 0.0),
            (0.0006, 30, 0.0),
            (0.0006, 40, 0.0),
            (0.0006, 50, 0.0),
            (0.0009, 60, 0.0),
            (0.0012, 70, 0.0),
        ]);
        let stats = compute_stats(&track, 0);

        assert_eq!(
            stats.pauses,
            vec![PauseSegment {
                start_point: 2,
                end_point: 5,
                duration_seconds: 30.0,
            }]
        );
        assert_eq!(stats.moving_duration, Duration::seconds(40));
        assert!(stats.moving_pace < stats.avg_pace);
        assert!(stats.moving_speed > stats.avg_speed);
    }

    #[test]
    fn test_short_stop_is_not_a_pause() {
        let track = track_from(&[
            (0.0, 0, 0.0),
            (0.0003, 10, 0.0),
            (0.0003, 15, 0.0),
            (0.0006, 25, 0.0),
        ]);
        assert!(find_pauses(&track).is_empty());
    }

    #[test]
    fn test_find_pauses_is_idempotent() {
        let track = track_from(&[
            (0.0, 0, 0.0),
            (0.0, 30, 0.0),
            (0.0003, 40, 0.0),
            (0.0003, 90, 0.0),
        ]);
        let first = find_pauses(&track);
        let second = find_pauses(&track);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_elevation_gain_and_loss() {
        let track = track_from(&[
            (0.0, 0, 100.0),
            (0.001, 30, 110.0),
            (0.002, 60, 105.0),
            (0.003, 90, 125.0),
        ]);
        let stats = compute_stats(&track, 0);
        assert_close(stats.elevation_gain, 30.0, 1e-9);
        assert_close(stats.elevation_loss, 5.0, 1e-9);
        assert_eq!(stats.min_elevation, 100.0);
        assert_eq!(stats.max_elevation, 125.0);
    }

    #[test]
    fn test_smoothing_suppresses_jitter_gain() {
        let samples: Vec<(f64, i64, f64)> = (0..20)
            .map(|i| {
                let jitter = if i % 2 == 0 { 3.0 } else { -3.0 };
                (i as f64 * 0.001, i as i64 * 30, 100.0 + jitter)
            })
            .collect();
        let track = track_from(&samples);

        let raw = compute_stats(&track, 0);
        let smoothed = compute_stats(&track, 5);
        assert!(smoothed.elevation_gain < raw.elevation_gain / 2.0);
    }

    #[test]
    fn test_smooth_points_clips_at_edges() {
        let track = track_from(&[(0.0, 0, 0.0), (0.0, 10, 3.0), (0.0, 20, 6.0), (0.0, 30, 9.0)]);
        let smoothed = smooth_points(track.points(), 4);
        // Even window widens to 5 (half = 2).
        assert_close(smoothed[0].elevation, 3.0, 1e-9);
        assert_close(smoothed[1].elevation, 4.5, 1e-9);
        assert_close(smoothed[3].elevation, 6.0, 1e-9);
        assert_eq!(smoothed[2].timestamp, track.points()[2].timestamp);
    }

    #[test]
    fn test_heart_rate_aggregates() {
        let mut points = track_from(&[(0.0, 0, 0.0), (0.001, 30, 0.0), (0.002, 60, 0.0)])
            .points()
            .to_vec();
        points[0].heart_rate = Some(120);
        points[2].heart_rate = Some(160);
        let stats = compute_stats(&Track::new("HR", "#000000", points), 0);

        assert_eq!(stats.min_heart_rate, Some(120));
        assert_eq!(stats.max_heart_rate, Some(160));
        assert_close(stats.avg_heart_rate.unwrap(), 140.0, 1e-9);
        assert_eq!(stats.avg_cadence, None);
    }

    #[test]
    fn test_no_heart_rate_is_none() {
        let stats = compute_stats(&track_from(&[(0.0, 0, 0.0), (0.001, 30, 0.0)]), 0);
        assert_eq!(stats.avg_heart_rate, None);
        assert_eq!(stats.min_heart_rate, None);
    }

    #[test]
    fn test_max_speed_is_capped() {
        // ~1.1 km in 20s is ~200 km/h.
        let track = track_from(&[(0.0, 0, 0.0), (0.01, 20, 0.0), (0.0101, 40, 0.0)]);
        let stats = compute_stats(&track, 0);
        assert_eq!(stats.max_speed, 60.0);
    }

    #[test]
    fn test_splits_per_kilometer() {
        // 0.0045 deg is ~0.5 km; 5 samples make ~2.0 km with uneven pacing.
        let track = track_from(&[
            (0.0, 0, 0.0),
            (0.0045, 150, 0.0),
            (0.009, 300, 0.0),
            (0.0135, 420, 0.0),
            (0.018, 540, 0.0),
            (0.0225, 660, 0.0),
        ]);
        let stats = compute_stats(&track, 0);
        let splits = &stats.splits;

        // ~2.502 km: two full buckets plus a material ~0.5 km remainder.
        assert_eq!(splits.len(), 3);
        assert_close(splits[0].distance, 1.0, 1e-9);
        assert_close(splits[1].distance, 1.0, 1e-9);
        let split_total: f64 = splits.iter().map(|s| s.distance).sum();
        assert_close(split_total, stats.total_distance, 1e-9);

        assert!(splits[0].is_slowest);
        assert!(!splits[0].is_fastest);
        assert_eq!(splits.iter().filter(|s| s.is_fastest).count(), 1);
        assert_eq!(splits.iter().filter(|s| s.is_slowest).count(), 1);
    }

    #[test]
    fn test_immaterial_tail_is_dropped() {
        let total_lat = 0.0093; // ~1.034 km
        let track = track_from(&[(0.0, 0, 0.0), (total_lat, 360, 0.0)]);
        let splits = compute_splits(track.points(), &SplitConfig::default());

        assert_eq!(splits.len(), 1);
        assert!(!splits[0].is_fastest && !splits[0].is_slowest);
    }

    #[test]
    fn test_non_positive_bucket_yields_no_splits() {
        let track = track_from(&[(0.0, 0, 0.0), (0.01, 60, 0.0)]);
        for bucket_km in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let mut config = EngineConfig::default();
            config.splits.bucket_km = bucket_km;

            let stats = compute_stats_with(&track, 0, &config);

            assert!(stats.splits.is_empty(), "bucket_km = {bucket_km}");
            assert_close(stats.total_distance, 1.11, 0.01);
        }
    }

    fn split_with_pace(index: usize, pace: f64) -> Split {
        Split {
            index,
            distance: 1.0,
            duration: Duration::seconds_f64(pace * 60.0),
            pace,
            elevation_gain: 0.0,
            elevation_loss: 0.0,
            avg_heart_rate: None,
            is_fastest: false,
            is_slowest: false,
        }
    }

    #[test]
    fn test_equal_paces_flag_first_occurrence() {
        let mut splits = vec![
            split_with_pace(0, 5.0),
            split_with_pace(1, 5.0),
            split_with_pace(2, 5.0),
        ];
        flag_extremes(&mut splits, 0.5);

        let fastest: Vec<bool> = splits.iter().map(|s| s.is_fastest).collect();
        let slowest: Vec<bool> = splits.iter().map(|s| s.is_slowest).collect();
        assert_eq!(fastest, vec![true, false, false]);
        assert_eq!(slowest, vec![true, false, false]);

        let mut splits = vec![
            split_with_pace(0, 6.0),
            split_with_pace(1, 4.5),
            split_with_pace(2, 4.5),
            split_with_pace(3, 6.0),
        ];
        flag_extremes(&mut splits, 0.5);

        assert!(splits[0].is_slowest && !splits[3].is_slowest);
        assert!(splits[1].is_fastest && !splits[2].is_fastest);
    }

    #[test]
    fn test_segment_stats() {
        let track = track_from(&[
            (0.0, 0, 0.0),
            (0.009, 300, 10.0),
            (0.018, 600, 30.0),
        ]);
        let stats = segment_stats(&track, 0.5, 1.5, 0);
        assert_close(stats.total_distance, 1.0, 1e-6);
        assert!(stats.elevation_gain > 0.0);
        assert_eq!(segment_stats(&track, 1.5, 0.5, 0), TrackStats::default());
    }

    #[test]
    fn test_batch_matches_sequential() {
        let tracks = vec![
            track_from(&[(0.0, 0, 0.0), (0.01, 60, 5.0)]),
            track_from(&[(0.0, 0, 0.0), (0.02, 600, 50.0), (0.03, 900, 40.0)]),
        ];
        let config = EngineConfig::default();
        let batch = compute_stats_batch(&tracks, 0, &config);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], compute_stats(&tracks[1], 0));
    }
}
