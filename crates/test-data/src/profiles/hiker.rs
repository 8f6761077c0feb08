//! Hiker athletic profile.

use track_engine::ActivityType;

use super::AthleteProfile;

/// Athletic profile for hiking activities.
///
/// - Base speed: ~5.5 km/h (1.5 m/s) on flat terrain
/// - Uphill: ~12% slower per 1% grade
/// - Downhill: ~5% faster per 1% grade
#[derive(Debug, Clone)]
pub struct HikerProfile {
    /// Base speed in m/s on flat terrain.
    base_speed: f64,
    variance: f64,
}

impl Default for HikerProfile {
    fn default() -> Self {
        Self {
            base_speed: 1.5, // ~5.5 km/h
            variance: 0.12,
        }
    }
}

impl HikerProfile {
    pub fn with_speed(speed_kmh: f64) -> Self {
        Self {
            base_speed: speed_kmh / 3.6,
            ..Default::default()
        }
    }

    /// ~6.5 km/h base.
    pub fn fast() -> Self {
        Self::with_speed(6.5)
    }

    /// ~4.0 km/h base.
    pub fn leisurely() -> Self {
        Self::with_speed(4.0)
    }

    /// Slower, with more fatigue variance from pack weight.
    pub fn backpacker() -> Self {
        Self {
            base_speed: 1.2,
            variance: 0.15,
        }
    }
}

impl AthleteProfile for HikerProfile {
    fn activity_type(&self) -> ActivityType {
        ActivityType::Hiking
    }

    fn base_speed_mps(&self) -> f64 {
        self.base_speed
    }

    fn grade_factor(&self, grade: f64) -> f64 {
        if grade >= 0.0 {
            (1.0 - grade * 12.0).max(0.25)
        } else {
            (1.0 - grade * 5.0).min(1.3)
        }
    }

    fn variance(&self) -> f64 {
        self.variance
    }

    fn cadence(&self, speed_mps: f64, _grade: f64) -> Option<i32> {
        Some((85.0 + speed_mps * 15.0).round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = HikerProfile::default();
        assert!((profile.base_speed_mps() - 1.5).abs() < 0.01);
    }

    #[test]
    fn test_moderate_climb() {
        let factor = HikerProfile::default().grade_factor(0.05);
        assert!(factor > 0.3 && factor < 0.8);
    }

    #[test]
    fn test_conservative_descent() {
        let factor = HikerProfile::default().grade_factor(-0.05);
        assert!(factor > 1.0 && factor < 1.3);
    }
}
