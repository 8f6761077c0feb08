//! Cyclist athletic profile.

use track_engine::ActivityType;

use super::{AthleteProfile, HeartRateRange};

/// Athletic profile for cycling activities.
///
/// - Base speed: ~28 km/h (8.0 m/s) on flat terrain
/// - Uphill: ~25% slower per 1% grade
/// - Downhill: ~15% faster per 1% grade
#[derive(Debug, Clone)]
pub struct CyclistProfile {
    /// Base speed in m/s on flat terrain.
    base_speed: f64,
    variance: f64,
    activity_type: ActivityType,
}

impl Default for CyclistProfile {
    fn default() -> Self {
        Self {
            base_speed: 8.0, // ~28 km/h
            variance: 0.10,
            activity_type: ActivityType::Cycling,
        }
    }
}

impl CyclistProfile {
    pub fn with_speed(speed_kmh: f64) -> Self {
        Self {
            base_speed: speed_kmh / 3.6,
            ..Default::default()
        }
    }

    /// ~35 km/h base.
    pub fn elite() -> Self {
        Self::with_speed(35.0)
    }

    /// ~22 km/h base.
    pub fn recreational() -> Self {
        Self::with_speed(22.0)
    }

    /// ~18 km/h base with more variance for technical terrain.
    pub fn mountain_biker() -> Self {
        Self {
            base_speed: 5.0,
            variance: 0.15,
            activity_type: ActivityType::MountainBiking,
        }
    }
}

impl AthleteProfile for CyclistProfile {
    fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            // Floor is roughly walking speed.
            (1.0 - grade * 25.0).max(0.15)
        } else {
            (1.0 - grade * 15.0).min(2.5)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn heart_rate_range(&self) -> HeartRateRange {
        HeartRateRange {
            resting: 50,
            max: 182,
        }
    }

    fn cadence(&self, speed_mps: f64, grade: f64) -> Option<i32> {
        if grade < -0.04 {
            return None;
        }
        let rpm = 55.0 + speed_mps * 4.0;
        Some(rpm.clamp(50.0, 110.0).round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = CyclistProfile::default();
        assert!((profile.base_speed_mps() - 8.0).abs() < 0.01);
    }

    #[test]
    fn test_steep_climb() {
        let profile = CyclistProfile::default();
        assert!(profile.grade_factor(0.10) < 0.5);
    }

    #[test]
    fn test_downhill_boost() {
        let profile = CyclistProfile::default();
        assert!(profile.grade_factor(-0.05) > 1.5);
    }

    #[test]
    fn test_coasting_has_no_cadence() {
        let profile = CyclistProfile::default();
        assert!(profile.cadence(12.0, -0.06).is_none());
        assert!(profile.cadence(8.0, 0.0).is_some());
    }

    #[test]
    fn test_mountain_biker_activity() {
        assert_eq!(
            CyclistProfile::mountain_biker().activity_type(),
            ActivityType::MountainBiking
        );
    }
}
