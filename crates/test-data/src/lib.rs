//! Synthetic GPS tracks for exercising track-engine.
//!
//! Tracks are laid over a Perlin elevation surface and timed by an athlete
//! profile, so grades slow climbs, descents speed up, and heart rate follows
//! effort. The `race` binary replays a generated field through
//! [`track_engine::RaceSimulation`].
//!
//! ```rust,ignore
//! use test_data::prelude::*;
//!
//! let mut rng = StdRng::seed_from_u64(12345);
//! let track = ProceduralGenerator::new(42)
//!     .with_distance(5000.0)
//!     .with_pauses(0.01, 20.0, 90.0)
//!     .generate(&RunnerProfile::default(), &mut rng);
//! ```

pub mod config;
pub mod profiles;
pub mod sources;
pub mod terrain;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::config::{BoundingBox, RaceFieldConfig, Region};
    pub use crate::profiles::{
        AthleteProfile, CyclistProfile, HeartRateRange, HikerProfile, RunnerProfile,
        heart_rate_at, sample_variance, speed_at_grade,
    };
    pub use crate::sources::{PALETTE, ProceduralGenerator, TrackConfig};
    pub use crate::terrain::ElevationGenerator;
    pub use rand::SeedableRng;
    pub use rand::rngs::StdRng;
}
