//! Terrain generation: Perlin-noise elevation surfaces.

mod elevation;

pub use elevation::ElevationGenerator;
