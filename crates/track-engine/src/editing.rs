//! Track editing: cut, trim, merge, and GPS outlier correction.
//!
//! Every function takes the input by reference and returns a new [`Track`]
//! whose distances were rebuilt by [`recompute_metrics`](crate::track_index::recompute_metrics).
//! Invalid ranges are no-ops that hand back a copy of the input.

use serde::Serialize;
use time::Duration;
use tracing::debug;

use crate::{
    config::EngineConfig,
    geometry,
    models::{Track, TrackPoint},
    track_index::points_in_range,
};

/// Removes `[start, end]` kilometers and closes the gap in both space and time.
///
/// Interpolated boundary points are spliced on either side of the removed
/// range, and every later point is shifted back by the removed duration.
pub fn cut(track: &Track, start: f64, end: f64) -> Track {
    let total = track.total_distance();
    if track.is_degenerate() || !(start < end) || start < 0.0 || end > total {
        debug!(start, end, total, "Ignoring cut with invalid range");
        return track.clone();
    }

    let mut points = points_in_range(track, 0.0, start);
    let tail = points_in_range(track, end, total);

    let (Some(cut_start), Some(cut_end)) = (points.last(), tail.first()) else {
        return track.clone();
    };
    let removed = cut_end.timestamp - cut_start.timestamp;

    points.extend(tail.into_iter().map(|mut p| {
        p.timestamp -= removed;
        p
    }));

    debug!(start, end, removed_secs = removed.as_seconds_f64(), "Cut track");
    track.with_points(points)
}

/// Keeps only `[start, end]` kilometers.
///
/// Cumulative distance restarts at zero on the first kept point. A result with
/// fewer than two points becomes an empty track.
pub fn trim(track: &Track, start: f64, end: f64) -> Track {
    let total = track.total_distance();
    if !(start < end) || start < 0.0 || end > total {
        debug!(start, end, total, "Ignoring trim with invalid range");
        return track.clone();
    }

    let points = points_in_range(track, start, end);
    if points.len() < 2 {
        return track.emptied();
    }

    track.with_points(points)
}

/// Concatenates tracks in start-time order.
///
/// Each track after the first is shifted in time so that it begins exactly
/// one second after the previous track ends.
pub fn merge(tracks: &[Track]) -> Track {
    merge_with(tracks, &EngineConfig::default())
}

pub fn merge_with(tracks: &[Track], config: &EngineConfig) -> Track {
    let mut ordered: Vec<&Track> = tracks.iter().filter(|t| !t.is_empty()).collect();
    ordered.sort_by_key(|t| t.start_time());

    let name = ordered
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(" + ");
    let color = ordered
        .first()
        .map(|t| t.color.clone())
        .unwrap_or_default();

    let gap = Duration::seconds_f64(config.merge_gap_secs);
    let mut points: Vec<TrackPoint> = Vec::with_capacity(ordered.iter().map(|t| t.len()).sum());

    for track in &ordered {
        let first = track.points()[0].timestamp;
        let shift = match points.last() {
            Some(prev) => prev.timestamp + gap - first,
            None => Duration::ZERO,
        };
        points.extend(track.points().iter().map(|p| TrackPoint {
            timestamp: p.timestamp + shift,
            ..*p
        }));
    }

    debug!(tracks = ordered.len(), points = points.len(), "Merged tracks");
    Track::new(name, color, points)
}

/// Result of [`smooth_outliers`].
#[derive(Debug, Clone, Serialize)]
pub struct OutlierCorrection {
    pub track: Track,
    /// Number of points whose position was replaced; zero means nothing needed fixing.
    pub corrected_count: usize,
}

/// Replaces points implying an impossible speed with their neighbors' midpoint.
///
/// A point is an outlier when reaching it from the most recent accepted point
/// requires more than the configured outlier speed. Only latitude, longitude,
/// and elevation are corrected; timestamps are kept.
pub fn smooth_outliers(track: &Track) -> OutlierCorrection {
    smooth_outliers_with(track, &EngineConfig::default())
}

pub fn smooth_outliers_with(track: &Track, config: &EngineConfig) -> OutlierCorrection {
    let flagged = find_outliers(track.points(), config.outlier_speed_kmh);
    if !flagged.contains(&true) {
        return OutlierCorrection {
            track: track.clone(),
            corrected_count: 0,
        };
    }

    let points = track.points();
    let n = points.len();

    let mut left: Vec<Option<usize>> = vec![None; n];
    let mut nearest = None;
    for i in 0..n {
        left[i] = nearest;
        if !flagged[i] {
            nearest = Some(i);
        }
    }
    let mut right: Vec<Option<usize>> = vec![None; n];
    nearest = None;
    for i in (0..n).rev() {
        right[i] = nearest;
        if !flagged[i] {
            nearest = Some(i);
        }
    }

    let mut corrected = points.to_vec();
    let mut corrected_count = 0;
    for i in (0..n).filter(|&i| flagged[i]) {
        let replacement = match (left[i], right[i]) {
            (Some(a), Some(b)) => Some((
                (points[a].lat + points[b].lat) / 2.0,
                (points[a].lon + points[b].lon) / 2.0,
                (points[a].elevation + points[b].elevation) / 2.0,
            )),
            (Some(a), None) | (None, Some(a)) => {
                Some((points[a].lat, points[a].lon, points[a].elevation))
            }
            (None, None) => None,
        };

        if let Some((lat, lon, elevation)) = replacement {
            corrected[i].lat = lat;
            corrected[i].lon = lon;
            corrected[i].elevation = elevation;
            corrected_count += 1;
        }
    }

    debug!(corrected_count, "Corrected GPS outliers");
    OutlierCorrection {
        track: track.with_points(corrected),
        corrected_count,
    }
}

/// Flags points that cannot be reached from the last accepted point below `limit_kmh`.
///
/// The first point has no predecessor, so it is flagged only when it is out
/// of reach of both following points while those two agree with each other.
fn find_outliers(points: &[TrackPoint], limit_kmh: f64) -> Vec<bool> {
    let too_fast = |a: &TrackPoint, b: &TrackPoint| {
        geometry::speed_kmh(geometry::distance(a, b), b.timestamp - a.timestamp)
            .is_some_and(|speed| speed > limit_kmh)
    };

    let mut flagged = vec![false; points.len()];
    let mut last_good = 0;
    if let [first, second, third, ..] = points
        && too_fast(first, second)
        && too_fast(first, third)
        && !too_fast(second, third)
    {
        flagged[0] = true;
        last_good = 1;
    }

    for i in last_good + 1..points.len() {
        if too_fast(&points[last_good], &points[i]) {
            flagged[i] = true;
        } else {
            last_good = i;
        }
    }

    flagged
}
