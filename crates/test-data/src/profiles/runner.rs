//! Runner athletic profile.

use track_engine::ActivityType;

use super::{AthleteProfile, HeartRateRange};

/// Athletic profile for running activities.
///
/// - Base pace: ~5:00/km (3.5 m/s)
/// - Uphill: ~15% slower per 1% grade
/// - Downhill: ~8% faster per 1% grade, capped
#[derive(Debug, Clone)]
pub struct RunnerProfile {
    /// Base speed in m/s on flat terrain.
    base_speed: f64,
    variance: f64,
    heart_rate: HeartRateRange,
}

impl Default for RunnerProfile {
    fn default() -> Self {
        Self {
            base_speed: 3.5, // ~5:00/km
            variance: 0.08,
            heart_rate: HeartRateRange {
                resting: 52,
                max: 190,
            },
        }
    }
}

impl RunnerProfile {
    /// Creates a runner with the given base pace in minutes per kilometer.
    pub fn with_pace(pace_min_per_km: f64) -> Self {
        let base_speed = 1000.0 / (pace_min_per_km * 60.0);
        Self {
            base_speed,
            ..Default::default()
        }
    }

    /// ~3:30/km base pace.
    pub fn elite() -> Self {
        Self::with_pace(3.5)
    }

    /// ~6:00/km base pace.
    pub fn recreational() -> Self {
        Self::with_pace(6.0)
    }

    /// Removes day-to-day variance so every step runs at the grade-adjusted pace.
    pub fn steady(mut self) -> Self {
        self.variance = 0.0;
        self
    }
}

impl AthleteProfile for RunnerProfile {
    fn activity_type(&self) -> ActivityType {
        ActivityType::Running
    }

    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            (1.0 - grade * 15.0).max(0.2)
        } else {
            // grade is negative, so this adds
            (1.0 - grade * 8.0).min(1.5)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn heart_rate_range(&self) -> HeartRateRange {
        self.heart_rate
    }

    fn cadence(&self, speed_mps: f64, _grade: f64) -> Option<i32> {
        let spm = 140.0 + speed_mps * 9.0;
        Some(spm.clamp(150.0, 200.0).round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = RunnerProfile::default();
        assert!((profile.base_speed_mps() - 3.5).abs() < 0.01);
        assert_eq!(profile.activity_type(), ActivityType::Running);
    }

    #[test]
    fn test_grade_factors() {
        let profile = RunnerProfile::default();
        assert!((profile.grade_factor(0.0) - 1.0).abs() < 0.01);
        assert!(profile.grade_factor(0.05) < 1.0);
        assert!(profile.grade_factor(-0.05) > 1.0);
    }

    #[test]
    fn test_cadence_rises_with_speed() {
        let profile = RunnerProfile::default();
        let slow = profile.cadence(2.5, 0.0).unwrap();
        let fast = profile.cadence(5.0, 0.0).unwrap();
        assert!(fast > slow);
        assert!((150..=200).contains(&slow));
    }
}
