//! Athletic performance profiles.
//!
//! Profiles give generated tracks their speed, heart rate, and cadence. The
//! procedural generator asks the profile for a target speed at each step's
//! grade and derives the sensor channels from the resulting effort.

mod cyclist;
mod hiker;
mod runner;

pub use cyclist::CyclistProfile;
pub use hiker::HikerProfile;
pub use runner::RunnerProfile;

use rand_distr::{Distribution, Normal};
use track_engine::ActivityType;

/// Resting and maximum heart rate of a simulated athlete, in bpm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartRateRange {
    pub resting: i32,
    pub max: i32,
}

impl Default for HeartRateRange {
    fn default() -> Self {
        Self {
            resting: 55,
            max: 185,
        }
    }
}

pub trait AthleteProfile: Send + Sync {
    fn activity_type(&self) -> ActivityType;

    /// Base speed on flat terrain in meters per second.
    fn base_speed_mps(&self) -> f64;

    /// Speed multiplier for a given grade (expressed as a fraction, e.g., 0.05 = 5% grade).
    ///
    /// Below 1.0 is slower than base (uphill), above 1.0 faster (downhill).
    fn grade_factor(&self, grade: f64) -> f64;

    /// Day-to-day performance variance as a coefficient of variation (0.0 - 1.0).
    fn variance(&self) -> f64;

    fn heart_rate_range(&self) -> HeartRateRange {
        HeartRateRange::default()
    }

    /// Steps or pedal revolutions per minute at the given speed and grade.
    /// `None` while coasting.
    fn cadence(&self, speed_mps: f64, grade: f64) -> Option<i32>;
}

pub fn speed_at_grade(profile: &dyn AthleteProfile, grade: f64, variance_factor: f64) -> f64 {
    let target = profile.base_speed_mps() * profile.grade_factor(grade);
    // Floor keeps step durations finite.
    (target * variance_factor).max(0.5)
}

/// Samples a multiplier around 1.0 from the profile's variance.
pub fn sample_variance(profile: &dyn AthleteProfile, rng: &mut impl rand::Rng) -> f64 {
    let std_dev = profile.variance();
    match Normal::new(1.0, std_dev) {
        Ok(normal) if std_dev > 0.0 => normal.sample(rng).clamp(0.7, 1.4),
        _ => 1.0,
    }
}

/// Heart rate for a step, driven by relative speed and climbing effort.
///
/// Effort 1.0 (base speed on the flat) sits at 75% of the heart rate reserve.
pub fn heart_rate_at(profile: &dyn AthleteProfile, speed_mps: f64, grade: f64) -> i32 {
    let range = profile.heart_rate_range();
    let relative_speed = speed_mps / profile.base_speed_mps().max(0.1);
    let climb = grade.max(0.0) * 4.0;
    let effort = (relative_speed * 0.6 + climb + 0.15).clamp(0.2, 1.0);
    let reserve = f64::from(range.max - range.resting);
    range.resting + (reserve * effort).round() as i32
}
