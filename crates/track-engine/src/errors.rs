use thiserror::Error;

/// Errors raised at the engine's validation boundary.
///
/// The engine operations themselves are total: invalid queries yield `None`,
/// empty tracks, or zeroed statistics. These variants only surface when a
/// caller constructs a [`Track`](crate::models::Track) or an
/// [`EngineConfig`](crate::config::EngineConfig) from untrusted data.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid point at index {index}: {reason}")]
    InvalidPoint { index: usize, reason: String },

    #[error("Timestamps decrease at index {0}")]
    NonMonotonicTimestamps(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
