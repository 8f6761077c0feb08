//! Tunable thresholds for statistics, editing, and race replay.

use serde::{Deserialize, Serialize};

use crate::{errors::EngineError, models::ActivityType};

/// Pause detection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseConfig {
    /// Instantaneous speed below which a segment counts as stopped, in km/h.
    pub speed_threshold_kmh: f64,
    /// Minimum length of a stopped run before it is reported, in seconds.
    pub min_duration_secs: f64,
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self {
            speed_threshold_kmh: 1.0,
            min_duration_secs: 10.0,
        }
    }
}

/// Split bucketing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Nominal bucket size in kilometers.
    pub bucket_km: f64,
    /// A trailing partial bucket is kept only above this fraction of `bucket_km`.
    pub materiality_fraction: f64,
    /// Buckets shorter than this fraction of `bucket_km` never get fastest/slowest flags.
    pub ranking_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            bucket_km: 1.0,
            materiality_fraction: 0.05,
            ranking_fraction: 0.5,
        }
    }
}

/// Engine-wide thresholds. See [`EngineConfig::for_activity`] for presets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pause: PauseConfig,
    pub splits: SplitConfig,
    /// Implied segment speed above which a point is treated as a GPS outlier, in km/h.
    pub outlier_speed_kmh: f64,
    /// Ceiling applied to reported max speed, in km/h.
    pub max_speed_cap_kmh: f64,
    /// Distance window for live rolling pace during race replay, in kilometers.
    pub rolling_pace_window_km: f64,
    /// Synthetic gap inserted between merged tracks, in seconds.
    pub merge_gap_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pause: PauseConfig::default(),
            splits: SplitConfig::default(),
            outlier_speed_kmh: 50.0,
            max_speed_cap_kmh: 60.0,
            rolling_pace_window_km: 0.2,
            merge_gap_secs: 1.0,
        }
    }
}

impl EngineConfig {
    /// Returns the preset for a given activity type.
    pub fn for_activity(activity_type: ActivityType) -> Self {
        let base = Self::default();
        match activity_type {
            ActivityType::Running | ActivityType::Unknown => base,
            ActivityType::Cycling | ActivityType::MountainBiking => Self {
                pause: PauseConfig {
                    speed_threshold_kmh: 3.0,
                    ..base.pause
                },
                outlier_speed_kmh: 120.0,
                max_speed_cap_kmh: 100.0,
                ..base
            },
            ActivityType::Walking | ActivityType::Hiking => Self {
                outlier_speed_kmh: 20.0,
                ..base
            },
        }
    }

    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values that would make the engine's arithmetic meaningless.
    pub fn validate(&self) -> Result<(), EngineError> {
        let positive = [
            ("pause.speed_threshold_kmh", self.pause.speed_threshold_kmh),
            ("splits.bucket_km", self.splits.bucket_km),
            ("outlier_speed_kmh", self.outlier_speed_kmh),
            ("max_speed_cap_kmh", self.max_speed_cap_kmh),
            ("rolling_pace_window_km", self.rolling_pace_window_km),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("pause.min_duration_secs", self.pause.min_duration_secs),
            ("merge_gap_secs", self.merge_gap_secs),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }

        let fractions = [
            ("splits.materiality_fraction", self.splits.materiality_fraction),
            ("splits.ranking_fraction", self.splits.ranking_fraction),
        ];
        for (name, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be within 0..=1, got {value}"
                )));
            }
        }

        Ok(())
    }
}
