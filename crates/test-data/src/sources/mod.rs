//! Track geometry sources.

mod procedural;

pub use procedural::{PALETTE, ProceduralGenerator, TrackConfig};
