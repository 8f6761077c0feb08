//! Streaming per-point accumulators shared by track and split statistics.

use serde::{Deserialize, Serialize};

use crate::models::TrackPoint;

pub trait TrackMetric {
    type Score;
    fn next_point(&mut self, point: &TrackPoint);
    fn finish(&mut self) -> Self::Score;
}

/// Feeds every point to `metric` and returns its score.
pub fn score_points<M: TrackMetric>(mut metric: M, points: &[TrackPoint]) -> M::Score {
    for point in points {
        metric.next_point(point);
    }
    metric.finish()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationScore {
    pub gain: f64,
    pub loss: f64,
    pub min: f64,
    pub max: f64,
}

/// Sums positive and negative elevation deltas between consecutive points.
#[derive(Debug, Clone, Default)]
pub struct ElevationMetric {
    score: ElevationScore,
    last_elevation: Option<f64>,
}

impl TrackMetric for ElevationMetric {
    type Score = ElevationScore;

    fn next_point(&mut self, point: &TrackPoint) {
        let elevation = point.elevation;
        match self.last_elevation {
            Some(last) => {
                let delta = elevation - last;
                if delta > 0.0 {
                    self.score.gain += delta;
                } else {
                    self.score.loss += -delta;
                }
                self.score.min = self.score.min.min(elevation);
                self.score.max = self.score.max.max(elevation);
            }
            None => {
                self.score.min = elevation;
                self.score.max = elevation;
            }
        }
        self.last_elevation = Some(elevation);
    }

    fn finish(&mut self) -> ElevationScore {
        self.score
    }
}

/// Min/avg/max of a sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSummary {
    pub min: i32,
    pub avg: f64,
    pub max: i32,
}

/// Aggregates one sensor channel over points carrying a positive sample.
#[derive(Debug, Clone)]
pub struct SensorMetric {
    select: fn(&TrackPoint) -> Option<i32>,
    min: i32,
    max: i32,
    sum: i64,
    count: usize,
}

impl SensorMetric {
    fn new(select: fn(&TrackPoint) -> Option<i32>) -> Self {
        Self {
            select,
            min: i32::MAX,
            max: i32::MIN,
            sum: 0,
            count: 0,
        }
    }

    pub fn heart_rate() -> Self {
        Self::new(|p| p.heart_rate)
    }

    pub fn cadence() -> Self {
        Self::new(|p| p.cadence)
    }
}

impl TrackMetric for SensorMetric {
    type Score = Option<SensorSummary>;

    fn next_point(&mut self, point: &TrackPoint) {
        if let Some(value) = (self.select)(point).filter(|v| *v > 0) {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
            self.sum += i64::from(value);
            self.count += 1;
        }
    }

    fn finish(&mut self) -> Option<SensorSummary> {
        (self.count > 0).then(|| SensorSummary {
            min: self.min,
            avg: self.sum as f64 / self.count as f64,
            max: self.max,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PointScores {
    pub elevation: ElevationScore,
    pub heart_rate: Option<SensorSummary>,
    pub cadence: Option<SensorSummary>,
}

/// Elevation, heart rate, and cadence in a single pass.
#[derive(Debug, Clone)]
pub struct PointMetrics {
    elevation: ElevationMetric,
    heart_rate: SensorMetric,
    cadence: SensorMetric,
}

impl PointMetrics {
    pub fn new() -> Self {
        Self {
            elevation: ElevationMetric::default(),
            heart_rate: SensorMetric::heart_rate(),
            cadence: SensorMetric::cadence(),
        }
    }
}

impl Default for PointMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackMetric for PointMetrics {
    type Score = PointScores;

    fn next_point(&mut self, point: &TrackPoint) {
        self.elevation.next_point(point);
        self.heart_rate.next_point(point);
        self.cadence.next_point(point);
    }

    fn finish(&mut self) -> PointScores {
        PointScores {
            elevation: self.elevation.finish(),
            heart_rate: self.heart_rate.finish(),
            cadence: self.cadence.finish(),
        }
    }
}
