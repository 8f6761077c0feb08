//! Perlin noise-based elevation generation.

use noise::{NoiseFn, Perlin};
use track_engine::geometry::haversine_km;

/// Fractal Perlin surface sampled by latitude and longitude.
///
/// Several octaves are summed so the surface has both long climbs and short
/// rollers. The same seed always yields the same surface.
#[derive(Debug, Clone)]
pub struct ElevationGenerator {
    perlin: Perlin,
    /// Base elevation in meters.
    base_elevation: f64,
    /// Amplitude of the variation around the base.
    height_scale: f64,
    /// Spatial frequency in cycles per degree.
    frequency: f64,
    octaves: u32,
}

impl ElevationGenerator {
    pub fn new(seed: u32) -> Self {
        Self {
            perlin: Perlin::new(seed),
            base_elevation: 1500.0,
            height_scale: 200.0,
            frequency: 40.0,
            octaves: 4,
        }
    }

    /// Sierra Nevada terrain around Lake Tahoe.
    pub fn reno_tahoe(seed: u32) -> Self {
        Self {
            base_elevation: 1900.0,
            height_scale: 150.0,
            frequency: 30.0,
            octaves: 5,
            ..Self::new(seed)
        }
    }

    /// Front Range foothills.
    pub fn boulder(seed: u32) -> Self {
        Self {
            base_elevation: 1650.0,
            height_scale: 60.0,
            ..Self::new(seed)
        }
    }

    /// Gentle rolling hills.
    pub fn flat(seed: u32) -> Self {
        Self {
            base_elevation: 300.0,
            height_scale: 15.0,
            frequency: 60.0,
            octaves: 2,
            ..Self::new(seed)
        }
    }

    pub fn with_base_elevation(mut self, elevation: f64) -> Self {
        self.base_elevation = elevation;
        self
    }

    pub fn with_height_scale(mut self, scale: f64) -> Self {
        self.height_scale = scale;
        self
    }

    pub fn with_frequency(mut self, freq: f64) -> Self {
        self.frequency = freq;
        self
    }

    pub fn elevation_at(&self, lat: f64, lon: f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.frequency;
        let mut max_amplitude = 0.0;

        for _ in 0..self.octaves {
            total += self.perlin.get([lat * frequency, lon * frequency]) * amplitude;
            max_amplitude += amplitude;
            amplitude *= 0.5;
            frequency *= 2.0;
        }

        self.base_elevation + (total / max_amplitude) * self.height_scale
    }

    /// Rise over run between two coordinates; 0 when they coincide.
    pub fn grade(&self, from: (f64, f64), to: (f64, f64)) -> f64 {
        let run_m = haversine_km(from.0, from.1, to.0, to.1) * 1000.0;
        if run_m <= 0.0 {
            return 0.0;
        }
        (self.elevation_at(to.0, to.1) - self.elevation_at(from.0, from.1)) / run_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elevation_consistency() {
        let elev_gen = ElevationGenerator::new(42);
        let elev1 = elev_gen.elevation_at(39.5, -119.8);
        let elev2 = elev_gen.elevation_at(39.5, -119.8);
        assert!((elev1 - elev2).abs() < 0.001);
    }

    #[test]
    fn test_elevation_range() {
        let elev_gen = ElevationGenerator::new(42);
        let elev = elev_gen.elevation_at(39.5, -119.8);
        assert!(elev >= elev_gen.base_elevation - elev_gen.height_scale);
        assert!(elev <= elev_gen.base_elevation + elev_gen.height_scale);
    }

    #[test]
    fn test_flat_terrain_has_gentle_grades() {
        let elev_gen = ElevationGenerator::flat(7);
        let grade = elev_gen.grade((40.0, -105.3), (40.0009, -105.3));
        assert!(grade.abs() < 0.2);
    }

    #[test]
    fn test_grade_of_coincident_points_is_zero() {
        let elev_gen = ElevationGenerator::boulder(42);
        assert_eq!(elev_gen.grade((40.0, -105.3), (40.0, -105.3)), 0.0);
    }
}
