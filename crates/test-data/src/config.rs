//! Configuration types for synthetic track generation.

use serde::{Deserialize, Serialize};

/// Geographic bounding box defined by southwest and northeast corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude (south)
    pub min_lat: f64,
    /// Minimum longitude (west)
    pub min_lon: f64,
    /// Maximum latitude (north)
    pub max_lat: f64,
    /// Maximum longitude (east)
    pub max_lon: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// Returns a random point within the bounding box.
    pub fn random_point(&self, rng: &mut impl rand::Rng) -> (f64, f64) {
        let lat = rng.gen_range(self.min_lat..self.max_lat);
        let lon = rng.gen_range(self.min_lon..self.max_lon);
        (lat, lon)
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }
}

/// Pre-defined geographic regions.
#[derive(Debug, Clone, Copy)]
pub struct Region;

impl Region {
    /// Reno/Tahoe area - mountain trails with significant elevation changes.
    pub const RENO_TAHOE: BoundingBox = BoundingBox::new(39.0, -120.5, 39.6, -119.5);

    /// Boulder, CO area - popular fitness trails with varied terrain.
    pub const BOULDER: BoundingBox = BoundingBox::new(39.9, -105.5, 40.1, -105.2);
}

/// Parameters of a replayed race: field size, course, and clock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceFieldConfig {
    /// Number of generated runners.
    pub runners: usize,
    /// Course length in meters.
    pub distance_meters: f64,
    /// Seed shared by the terrain and the route RNG.
    pub seed: u64,
    /// Wall-clock step fed to every tick, in seconds.
    pub tick_seconds: f64,
    pub speed_multiplier: f64,
    pub region: BoundingBox,
}

impl Default for RaceFieldConfig {
    fn default() -> Self {
        Self {
            runners: 4,
            distance_meters: 5000.0,
            seed: 12345,
            tick_seconds: 1.0,
            speed_multiplier: 60.0,
            region: Region::BOULDER,
        }
    }
}

impl RaceFieldConfig {
    /// Reads overrides from `RACE_CONFIG` (a JSON object) if set.
    pub fn from_env() -> anyhow::Result<Self> {
        match std::env::var("RACE_CONFIG") {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(_) => Ok(Self::default()),
        }
    }
}
