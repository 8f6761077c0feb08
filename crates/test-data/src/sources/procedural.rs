//! Procedural track generation.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};
use track_engine::geometry::haversine_km;
use track_engine::{Track, TrackPoint};
use tracing::debug;

use crate::config::{BoundingBox, Region};
use crate::profiles::{self, AthleteProfile};
use crate::terrain::ElevationGenerator;

/// Meters per degree of latitude on the mean-radius sphere.
const METERS_PER_DEGREE: f64 = 111_195.0;

/// Latitude offset of an injected GPS spike (~1.1 km).
const SPIKE_OFFSET_DEG: f64 = 0.01;

/// Colors handed out to the runners of a generated field, in order.
pub const PALETTE: [&str; 8] = [
    "#e6194b", "#3cb44b", "#4363d8", "#f58231", "#911eb4", "#42d4f4", "#f032e6", "#bfef45",
];

#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Target distance in meters.
    pub distance_meters: f64,
    /// Starting point (lat, lon). If None, random within bounds.
    pub start_point: Option<(f64, f64)>,
    pub bounds: BoundingBox,
    pub start_time: OffsetDateTime,
    /// GPS position jitter standard deviation in meters.
    pub gps_jitter_m: f64,
    /// GPS elevation jitter standard deviation in meters.
    pub elevation_jitter_m: f64,
    /// Approximate distance between track points in meters.
    pub point_spacing_m: f64,
    /// Chance of a stop before each step.
    pub pause_probability: f64,
    /// Duration range for stops (min, max) in seconds.
    pub pause_duration_range: (f64, f64),
    /// Sampling interval while stopped, in seconds.
    pub pause_sample_secs: f64,
    /// Chance of an interior point being displaced by a GPS spike.
    pub spike_probability: f64,
    /// Whether points carry heart rate and cadence.
    pub sensors: bool,
    pub name: String,
    pub color: String,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            distance_meters: 5000.0,
            start_point: None,
            bounds: Region::BOULDER,
            start_time: datetime!(2024-06-01 07:00 UTC),
            gps_jitter_m: 3.0,
            elevation_jitter_m: 2.0,
            point_spacing_m: 10.0,
            pause_probability: 0.0,
            pause_duration_range: (30.0, 180.0),
            pause_sample_secs: 5.0,
            spike_probability: 0.0,
            sensors: true,
            name: "Generated".to_string(),
            color: PALETTE[0].to_string(),
        }
    }
}

/// Position and elevation noise for one generation run.
struct Noise {
    position_deg: Option<Normal<f64>>,
    elevation_m: Option<Normal<f64>>,
}

impl Noise {
    fn new(config: &TrackConfig) -> Self {
        Self {
            position_deg: Normal::new(0.0, config.gps_jitter_m / METERS_PER_DEGREE).ok(),
            elevation_m: Normal::new(0.0, config.elevation_jitter_m).ok(),
        }
    }

    fn position(&self, rng: &mut impl Rng) -> f64 {
        self.position_deg.as_ref().map_or(0.0, |d| d.sample(rng))
    }

    fn elevation(&self, rng: &mut impl Rng) -> f64 {
        self.elevation_m.as_ref().map_or(0.0, |d| d.sample(rng))
    }
}

/// Generates synthetic GPS tracks with realistic characteristics.
#[derive(Debug, Clone)]
pub struct ProceduralGenerator {
    config: TrackConfig,
    elevation: ElevationGenerator,
}

impl ProceduralGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            config: TrackConfig::default(),
            elevation: ElevationGenerator::boulder(seed),
        }
    }

    /// Creates a generator whose terrain matches the region.
    pub fn for_region(bounds: BoundingBox, seed: u32) -> Self {
        let elevation = if bounds.center().0 > 39.5 {
            ElevationGenerator::boulder(seed)
        } else {
            ElevationGenerator::reno_tahoe(seed)
        };

        Self {
            config: TrackConfig {
                bounds,
                ..Default::default()
            },
            elevation,
        }
    }

    pub fn config(&self) -> &TrackConfig {
        &self.config
    }

    pub fn with_distance(mut self, meters: f64) -> Self {
        self.config.distance_meters = meters;
        self
    }

    pub fn with_start(mut self, lat: f64, lon: f64) -> Self {
        self.config.start_point = Some((lat, lon));
        self
    }

    pub fn with_start_time(mut self, start_time: OffsetDateTime) -> Self {
        self.config.start_time = start_time;
        self
    }

    pub fn with_gps_jitter(mut self, meters: f64) -> Self {
        self.config.gps_jitter_m = meters;
        self
    }

    pub fn with_elevation_jitter(mut self, meters: f64) -> Self {
        self.config.elevation_jitter_m = meters;
        self
    }

    pub fn with_elevation(mut self, elevation: ElevationGenerator) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_point_spacing(mut self, meters: f64) -> Self {
        self.config.point_spacing_m = meters;
        self
    }

    pub fn with_pauses(mut self, probability: f64, min_sec: f64, max_sec: f64) -> Self {
        self.config.pause_probability = probability;
        self.config.pause_duration_range = (min_sec, max_sec);
        self
    }

    pub fn with_spikes(mut self, probability: f64) -> Self {
        self.config.spike_probability = probability;
        self
    }

    pub fn without_sensors(mut self) -> Self {
        self.config.sensors = false;
        self
    }

    pub fn named(mut self, name: impl Into<String>, color: impl Into<String>) -> Self {
        self.config.name = name.into();
        self.config.color = color.into();
        self
    }

    /// Generates one track whose timing follows `profile` over the terrain.
    pub fn generate(&self, profile: &dyn AthleteProfile, rng: &mut impl Rng) -> Track {
        let start = self
            .config
            .start_point
            .unwrap_or_else(|| self.config.bounds.random_point(rng));

        let path = self.generate_path(start, rng);
        let points = self.apply_timing(&path, profile, rng);
        debug!(
            points = points.len(),
            activity = ?profile.activity_type(),
            "generated track"
        );
        Track::new(self.config.name.clone(), self.config.color.clone(), points)
    }

    /// Generates one track per profile over a shared course and start time.
    ///
    /// Tracks are named `"<name> <n>"` and colored from [`PALETTE`] in order.
    pub fn generate_field(
        &self,
        profiles: &[&dyn AthleteProfile],
        rng: &mut impl Rng,
    ) -> Vec<Track> {
        let start = self
            .config
            .start_point
            .unwrap_or_else(|| self.config.bounds.random_point(rng));
        let path = self.generate_path(start, rng);

        let mut field = Vec::with_capacity(profiles.len());
        for (i, profile) in profiles.iter().enumerate() {
            let points = self.apply_timing(&path, *profile, rng);
            field.push(Track::new(
                format!("{} {}", self.config.name, i + 1),
                PALETTE[i % PALETTE.len()],
                points,
            ));
        }
        debug!(runners = field.len(), course_points = path.len(), "generated field");
        field
    }

    /// Random walk with momentum, bounced off the bounding box.
    pub fn generate_path(&self, start: (f64, f64), rng: &mut impl Rng) -> Vec<(f64, f64)> {
        let mut path = vec![start];
        let mut current = start;
        let mut total_distance = 0.0;
        let mut heading = rng.gen_range(0.0..std::f64::consts::TAU);

        while total_distance < self.config.distance_meters {
            heading += rng.gen_range(-0.3..0.3);
            let step = self.config.point_spacing_m * rng.gen_range(0.8..1.2);

            let lat_delta = (step * heading.cos()) / METERS_PER_DEGREE;
            let lon_delta =
                (step * heading.sin()) / (METERS_PER_DEGREE * current.0.to_radians().cos());

            let (next_lat, next_lon, bounced_heading) =
                self.apply_bounds(current.0 + lat_delta, current.1 + lon_delta, heading);
            heading = bounced_heading;

            let next = (next_lat, next_lon);
            total_distance += haversine_km(current.0, current.1, next.0, next.1) * 1000.0;
            current = next;
            path.push(current);
        }

        path
    }

    fn apply_bounds(&self, lat: f64, lon: f64, heading: f64) -> (f64, f64, f64) {
        let b = &self.config.bounds;
        let mut new_heading = heading;

        let lat = if lat < b.min_lat {
            new_heading = std::f64::consts::PI - heading;
            b.min_lat + (b.min_lat - lat).min(0.001)
        } else if lat > b.max_lat {
            new_heading = std::f64::consts::PI - heading;
            b.max_lat - (lat - b.max_lat).min(0.001)
        } else {
            lat
        };

        let lon = if lon < b.min_lon {
            new_heading = -heading;
            b.min_lon + (b.min_lon - lon).min(0.001)
        } else if lon > b.max_lon {
            new_heading = -heading;
            b.max_lon - (lon - b.max_lon).min(0.001)
        } else {
            lon
        };

        (lat, lon, new_heading)
    }

    fn apply_timing(
        &self,
        path: &[(f64, f64)],
        profile: &dyn AthleteProfile,
        rng: &mut impl Rng,
    ) -> Vec<TrackPoint> {
        let Some(&first) = path.first() else {
            return Vec::new();
        };

        let noise = Noise::new(&self.config);
        let mut timestamp = self.config.start_time;
        let mut points = Vec::with_capacity(path.len());
        points.push(self.sample_point(
            first,
            timestamp,
            profile,
            profile.base_speed_mps(),
            0.0,
            &noise,
            rng,
        ));

        for pair in path.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            let run_m = haversine_km(from.0, from.1, to.0, to.1) * 1000.0;
            let grade = self.elevation.grade(from, to);
            let variance = profiles::sample_variance(profile, rng);
            let speed = profiles::speed_at_grade(profile, grade, variance);

            if rng.r#gen::<f64>() < self.config.pause_probability {
                self.insert_pause(&mut points, &mut timestamp, profile, rng);
            }

            timestamp += Duration::seconds_f64(run_m / speed);
            points.push(self.sample_point(to, timestamp, profile, speed, grade, &noise, rng));
        }

        if self.config.spike_probability > 0.0 {
            for i in 1..points.len().saturating_sub(1) {
                if rng.r#gen::<f64>() < self.config.spike_probability {
                    points[i].lat += SPIKE_OFFSET_DEG;
                }
            }
        }

        points
    }

    #[allow(clippy::too_many_arguments)]
    fn sample_point(
        &self,
        (lat, lon): (f64, f64),
        timestamp: OffsetDateTime,
        profile: &dyn AthleteProfile,
        speed_mps: f64,
        grade: f64,
        noise: &Noise,
        rng: &mut impl Rng,
    ) -> TrackPoint {
        let elevation = self.elevation.elevation_at(lat, lon) + noise.elevation(rng);
        let lat_jitter = noise.position(rng);
        let lon_jitter = noise.position(rng) / lat.to_radians().cos();
        let point = TrackPoint::new(lat + lat_jitter, lon + lon_jitter, elevation, timestamp);

        if !self.config.sensors {
            return point;
        }
        let point = point.with_heart_rate(profiles::heart_rate_at(profile, speed_mps, grade));
        match profile.cadence(speed_mps, grade) {
            Some(cadence) => point.with_cadence(cadence),
            None => point,
        }
    }

    /// Appends stationary samples at the last position while heart rate recovers.
    fn insert_pause(
        &self,
        points: &mut Vec<TrackPoint>,
        timestamp: &mut OffsetDateTime,
        profile: &dyn AthleteProfile,
        rng: &mut impl Rng,
    ) {
        let Some(&anchor) = points.last() else {
            return;
        };
        let (min_sec, max_sec) = self.config.pause_duration_range;
        let duration = if min_sec < max_sec {
            rng.gen_range(min_sec..max_sec)
        } else {
            min_sec
        };
        if duration <= 0.0 {
            return;
        }

        let samples = (duration / self.config.pause_sample_secs.max(1.0)).ceil() as i32;
        let interval = Duration::seconds_f64(duration / f64::from(samples));
        let recovered = profile.heart_rate_range().resting + 20;
        for k in 1..=samples {
            *timestamp += interval;
            points.push(TrackPoint {
                timestamp: *timestamp,
                heart_rate: anchor.heart_rate.map(|hr| (hr - 2 * k).max(recovered)),
                cadence: None,
                ..anchor
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiles::{CyclistProfile, RunnerProfile};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use track_engine::find_pauses;

    #[test]
    fn test_generate_track() {
        let track_gen = ProceduralGenerator::new(42).with_distance(1000.0);
        let profile = RunnerProfile::default();
        let mut rng = rand::thread_rng();

        let track = track_gen.generate(&profile, &mut rng);

        assert!(track.len() > 10);
        assert!(track.total_distance() > 0.9);
        assert!(track.points().iter().all(|p| p.heart_rate.is_some()));
    }

    #[test]
    fn test_timestamps_never_decrease() {
        let track_gen = ProceduralGenerator::new(42).with_distance(500.0);
        let profile = RunnerProfile::default();
        let mut rng = rand::thread_rng();

        let track = track_gen.generate(&profile, &mut rng);

        for window in track.points().windows(2) {
            assert!(window[1].timestamp >= window[0].timestamp);
        }
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let track_gen = ProceduralGenerator::new(7).with_distance(800.0);
        let profile = CyclistProfile::default();

        let a = track_gen.generate(&profile, &mut StdRng::seed_from_u64(99));
        let b = track_gen.generate(&profile, &mut StdRng::seed_from_u64(99));

        assert_eq!(a.points(), b.points());
    }

    #[test]
    fn test_inserted_pauses_are_detected() {
        let track_gen = ProceduralGenerator::new(3)
            .with_distance(1000.0)
            .with_gps_jitter(0.0)
            .with_pauses(0.1, 30.0, 60.0);
        let profile = RunnerProfile::default();
        let mut rng = StdRng::seed_from_u64(11);

        let track = track_gen.generate(&profile, &mut rng);

        assert!(!find_pauses(&track).is_empty());
    }

    #[test]
    fn test_field_shares_start_and_course() {
        let track_gen = ProceduralGenerator::new(5).with_distance(600.0).with_gps_jitter(0.0);
        let fast = RunnerProfile::elite();
        let slow = RunnerProfile::recreational();
        let mut rng = StdRng::seed_from_u64(1);

        let field = track_gen.generate_field(&[&fast, &slow], &mut rng);

        assert_eq!(field.len(), 2);
        assert_eq!(field[0].points()[0].lat, field[1].points()[0].lat);
        assert_eq!(field[0].start_time(), field[1].start_time());
        assert_eq!(field[1].color, PALETTE[1]);
        assert!(field[0].total_duration() < field[1].total_duration());
    }
}
