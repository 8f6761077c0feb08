use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{errors::EngineError, geometry::Positioned, track_index};

/// A recorded geographic sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters.
    pub elevation: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Positioned for GeoPoint {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// A geographic sample positioned along its track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation in meters.
    pub elevation: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Kilometers from the first point of the track.
    ///
    /// Owned by [`track_index::recompute_metrics`]; values supplied by callers
    /// are overwritten whenever a track is built.
    #[serde(default)]
    pub cumulative_distance: f64,
    /// Heart rate in beats per minute
    #[serde(default)]
    pub heart_rate: Option<i32>,
    /// Cadence in steps or revolutions per minute
    #[serde(default)]
    pub cadence: Option<i32>,
}

impl TrackPoint {
    pub fn new(lat: f64, lon: f64, elevation: f64, timestamp: OffsetDateTime) -> Self {
        Self {
            lat,
            lon,
            elevation,
            timestamp,
            cumulative_distance: 0.0,
            heart_rate: None,
            cadence: None,
        }
    }

    pub fn with_heart_rate(mut self, heart_rate: i32) -> Self {
        self.heart_rate = Some(heart_rate);
        self
    }

    pub fn with_cadence(mut self, cadence: i32) -> Self {
        self.cadence = Some(cadence);
        self
    }

    pub fn geo_point(&self) -> GeoPoint {
        GeoPoint {
            lat: self.lat,
            lon: self.lon,
            elevation: self.elevation,
            timestamp: self.timestamp,
        }
    }
}

impl From<GeoPoint> for TrackPoint {
    fn from(p: GeoPoint) -> Self {
        TrackPoint::new(p.lat, p.lon, p.elevation, p.timestamp)
    }
}

impl Positioned for TrackPoint {
    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

/// Activity types with distinct engine presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    #[default]
    Running,
    Cycling,
    MountainBiking,
    Walking,
    Hiking,
    Unknown,
}

/// An ordered GPS track with derived totals.
///
/// The point sequence and totals are only reachable through constructors and
/// the [`editing`](crate::editing) functions, which always rebuild distances
/// from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrackRecord")]
pub struct Track {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    points: Vec<TrackPoint>,
    /// Kilometers.
    total_distance: f64,
    total_duration: Duration,
}

impl Track {
    /// Builds a track and computes its cumulative distances and totals.
    pub fn new(name: impl Into<String>, color: impl Into<String>, points: Vec<TrackPoint>) -> Self {
        Self::from_parts(Uuid::new_v4(), name.into(), color.into(), points)
    }

    /// Like [`Track::new`], but rejects points that would corrupt the derived metrics.
    pub fn try_new(
        name: impl Into<String>,
        color: impl Into<String>,
        points: Vec<TrackPoint>,
    ) -> Result<Self, EngineError> {
        validate_points(&points)?;
        Ok(Self::new(name, color, points))
    }

    pub(crate) fn from_parts(
        id: Uuid,
        name: String,
        color: String,
        points: Vec<TrackPoint>,
    ) -> Self {
        let recomputed = track_index::recompute_metrics(points);
        Self {
            id,
            name,
            color,
            points: recomputed.points,
            total_distance: recomputed.total_distance,
            total_duration: recomputed.total_duration,
        }
    }

    /// A copy of this track's identity carrying a new point sequence.
    pub(crate) fn with_points(&self, points: Vec<TrackPoint>) -> Self {
        Self::from_parts(self.id, self.name.clone(), self.color.clone(), points)
    }

    /// A copy of this track's identity with no points.
    pub(crate) fn emptied(&self) -> Self {
        self.with_points(Vec::new())
    }

    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn total_duration(&self) -> Duration {
        self.total_duration
    }

    pub fn start_time(&self) -> Option<OffsetDateTime> {
        self.points.first().map(|p| p.timestamp)
    }

    pub fn end_time(&self) -> Option<OffsetDateTime> {
        self.points.last().map(|p| p.timestamp)
    }

    /// Tracks with fewer than two points have no distance, duration, or statistics.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 2
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Wire form of a [`Track`]; totals and cumulative distances are recomputed on load.
#[derive(Debug, Deserialize)]
struct TrackRecord {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(default)]
    name: String,
    #[serde(default)]
    color: String,
    points: Vec<TrackPoint>,
}

impl TryFrom<TrackRecord> for Track {
    type Error = EngineError;

    fn try_from(record: TrackRecord) -> Result<Self, Self::Error> {
        validate_points(&record.points)?;
        Ok(Track::from_parts(
            record.id,
            record.name,
            record.color,
            record.points,
        ))
    }
}

/// Checks coordinates are finite and in range and timestamps never decrease.
pub fn validate_points(points: &[TrackPoint]) -> Result<(), EngineError> {
    for (index, p) in points.iter().enumerate() {
        if !p.lat.is_finite() || !(-90.0..=90.0).contains(&p.lat) {
            return Err(EngineError::InvalidPoint {
                index,
                reason: format!("latitude {} out of range", p.lat),
            });
        }
        if !p.lon.is_finite() || !(-180.0..=180.0).contains(&p.lon) {
            return Err(EngineError::InvalidPoint {
                index,
                reason: format!("longitude {} out of range", p.lon),
            });
        }
        if !p.elevation.is_finite() {
            return Err(EngineError::InvalidPoint {
                index,
                reason: "elevation is not finite".to_string(),
            });
        }
    }

    if let Some(i) = points
        .windows(2)
        .position(|w| w[1].timestamp < w[0].timestamp)
    {
        return Err(EngineError::NonMonotonicTimestamps(i + 1));
    }

    Ok(())
}
