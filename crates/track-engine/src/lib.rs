//! Track kinematics, statistics, editing, and multi-track race replay.
//!
//! The engine turns ordered GPS samples into distance- and time-addressable
//! [`Track`]s, derives [`TrackStats`] from them, edits them through pure
//! functions in [`editing`], and replays several tracks against one virtual
//! clock in [`RaceSimulation`]. It performs no I/O and installs no tracing
//! subscriber; hosts own both.

pub mod config;
pub mod editing;
pub mod errors;
pub mod geometry;
pub mod metrics;
pub mod models;
pub mod simulation;
pub mod stats;
pub mod track_index;

pub use config::{EngineConfig, PauseConfig, SplitConfig};
pub use editing::{OutlierCorrection, cut, merge, smooth_outliers, trim};
pub use errors::EngineError;
pub use geometry::distance;
pub use models::{ActivityType, GeoPoint, Track, TrackPoint};
pub use simulation::{RaceFrame, RaceResult, RaceRunner, RaceSimulation, RaceState};
pub use stats::{PauseSegment, Split, TrackStats, compute_stats, find_pauses};
pub use track_index::{point_at_distance, point_at_time, points_in_range, recompute_metrics};
