//! Multi-track race replay against a single virtual clock.
//!
//! The simulation never schedules itself. A host drives it by calling
//! [`RaceSimulation::tick`] with the wall-clock time elapsed since the last
//! call; every call returns a fresh [`RaceFrame`] built from the virtual clock
//! and the selected tracks.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    config::EngineConfig,
    geometry::{pace_min_per_km, speed_kmh},
    models::{GeoPoint, Track, TrackPoint},
    track_index::{point_at_distance, point_at_time},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceState {
    Idle,
    Running,
    Paused,
    Finished,
}

/// Live state of one runner, rebuilt on every frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceRunner {
    pub track_id: Uuid,
    pub position: GeoPoint,
    /// Kilometers covered so far.
    pub distance: f64,
    /// Minutes per kilometer over the trailing rolling-pace window.
    pub current_pace: f64,
    pub color: String,
    pub finished: bool,
}

/// Recorded once per runner when its own track duration elapses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceResult {
    pub rank: usize,
    pub track_id: Uuid,
    pub finish_time_offset: Duration,
    /// km/h over the whole track.
    pub avg_speed: f64,
    /// Kilometers.
    pub distance: f64,
}

/// Everything a host needs to render one simulation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceFrame {
    pub state: RaceState,
    pub virtual_time: Duration,
    pub runners: Vec<RaceRunner>,
    pub ranks: BTreeMap<Uuid, usize>,
    /// Meters behind the leader.
    pub gaps: BTreeMap<Uuid, f64>,
    /// Results recorded during the call that produced this frame.
    pub new_results: Vec<RaceResult>,
}

#[derive(Debug, Clone)]
pub struct RaceSimulation {
    config: EngineConfig,
    state: RaceState,
    tracks: Vec<Track>,
    finished: Vec<bool>,
    results: Vec<RaceResult>,
    virtual_time: Duration,
    speed_multiplier: f64,
}

impl Default for RaceSimulation {
    fn default() -> Self {
        Self::new()
    }
}

impl RaceSimulation {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            state: RaceState::Idle,
            tracks: Vec::new(),
            finished: Vec::new(),
            results: Vec::new(),
            virtual_time: Duration::ZERO,
            speed_multiplier: 1.0,
        }
    }

    pub fn state(&self) -> RaceState {
        self.state
    }

    pub fn virtual_time(&self) -> Duration {
        self.virtual_time
    }

    pub fn speed_multiplier(&self) -> f64 {
        self.speed_multiplier
    }

    /// Results so far, in finish order.
    pub fn results(&self) -> &[RaceResult] {
        &self.results
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Starts a race between the given tracks, all leaving at virtual time zero.
    ///
    /// Returns `false` and leaves the simulation untouched when a race is
    /// already in progress, when fewer than two non-empty tracks are given, or
    /// when a track is selected twice.
    pub fn start(&mut self, tracks: Vec<Track>) -> bool {
        if matches!(self.state, RaceState::Running | RaceState::Paused) {
            warn!("Ignoring start while a race is in progress");
            return false;
        }

        let tracks: Vec<Track> = tracks.into_iter().filter(|t| !t.is_empty()).collect();
        if tracks.len() < 2 {
            warn!(tracks = tracks.len(), "A race needs at least two tracks");
            return false;
        }

        let mut seen = HashSet::new();
        if !tracks.iter().all(|t| seen.insert(t.id)) {
            warn!("Ignoring start with a track selected twice");
            return false;
        }

        info!(runners = tracks.len(), "Race started");
        self.finished = vec![false; tracks.len()];
        self.tracks = tracks;
        self.results.clear();
        self.virtual_time = Duration::ZERO;
        self.state = RaceState::Running;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != RaceState::Running {
            return false;
        }
        debug!(virtual_secs = self.virtual_time.as_seconds_f64(), "Race paused");
        self.state = RaceState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != RaceState::Paused {
            return false;
        }
        debug!(virtual_secs = self.virtual_time.as_seconds_f64(), "Race resumed");
        self.state = RaceState::Running;
        true
    }

    /// Drops the current race and returns to idle.
    pub fn reset(&mut self) {
        self.state = RaceState::Idle;
        self.tracks.clear();
        self.finished.clear();
        self.results.clear();
        self.virtual_time = Duration::ZERO;
    }

    /// Sets how many virtual seconds pass per wall-clock second.
    ///
    /// Non-finite or non-positive multipliers are ignored.
    pub fn set_speed_multiplier(&mut self, multiplier: f64) -> bool {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            warn!(multiplier, "Ignoring invalid speed multiplier");
            return false;
        }
        self.speed_multiplier = multiplier;
        true
    }

    /// Advances the virtual clock by `delta` times the speed multiplier.
    ///
    /// The clock saturates at [`Duration::MAX`]. Returns `None` when idle or finished. While paused the clock holds and
    /// the current frame is returned.
    pub fn tick(&mut self, delta: Duration) -> Option<RaceFrame> {
        match self.state {
            RaceState::Idle | RaceState::Finished => None,
            RaceState::Paused => Some(self.build_frame(Vec::new())),
            RaceState::Running => {
                let advance = Duration::saturating_seconds_f64(
                    delta.max(Duration::ZERO).as_seconds_f64() * self.speed_multiplier,
                );
                self.virtual_time = self.virtual_time.saturating_add(advance);
                let new_results = self.record_finishers();
                self.finish_if_done();
                Some(self.build_frame(new_results))
            }
        }
    }

    /// Moves the virtual clock to an absolute position while running or paused.
    ///
    /// Results are rebuilt from scratch so that seeking backwards un-finishes
    /// runners; the returned frame reports no new results.
    pub fn seek(&mut self, virtual_time: Duration) -> Option<RaceFrame> {
        if !matches!(self.state, RaceState::Running | RaceState::Paused) {
            return None;
        }

        self.virtual_time = virtual_time.max(Duration::ZERO);
        self.results.clear();
        self.finished.iter_mut().for_each(|f| *f = false);
        self.record_finishers();
        self.finish_if_done();
        Some(self.build_frame(Vec::new()))
    }

    /// The current frame without advancing the clock.
    pub fn frame(&self) -> Option<RaceFrame> {
        (self.state != RaceState::Idle).then(|| self.build_frame(Vec::new()))
    }

    /// Records a result for every runner whose track has run out.
    ///
    /// Runners crossing during the same step are ordered by their own finish
    /// time, then by selection order.
    fn record_finishers(&mut self) -> Vec<RaceResult> {
        let mut crossing: Vec<usize> = (0..self.tracks.len())
            .filter(|&i| !self.finished[i] && self.virtual_time >= self.tracks[i].total_duration())
            .collect();
        crossing.sort_by_key(|&i| (self.tracks[i].total_duration(), i));

        let mut new_results = Vec::with_capacity(crossing.len());
        for i in crossing {
            let track = &self.tracks[i];
            let result = RaceResult {
                rank: self.results.len() + 1,
                track_id: track.id,
                finish_time_offset: track.total_duration(),
                avg_speed: speed_kmh(track.total_distance(), track.total_duration())
                    .unwrap_or(0.0),
                distance: track.total_distance(),
            };
            info!(
                rank = result.rank,
                track_id = %result.track_id,
                finish_secs = result.finish_time_offset.as_seconds_f64(),
                "Runner finished"
            );
            self.finished[i] = true;
            self.results.push(result.clone());
            new_results.push(result);
        }

        new_results
    }

    fn finish_if_done(&mut self) {
        if self.finished.iter().all(|&f| f) {
            info!(runners = self.tracks.len(), "Race finished");
            self.state = RaceState::Finished;
        }
    }

    fn build_frame(&self, new_results: Vec<RaceResult>) -> RaceFrame {
        let runners: Vec<RaceRunner> = self
            .tracks
            .iter()
            .enumerate()
            .filter_map(|(i, track)| self.runner(track, self.finished[i]))
            .collect();

        let mut ranks: BTreeMap<Uuid, usize> =
            self.results.iter().map(|r| (r.track_id, r.rank)).collect();

        let mut running: Vec<&RaceRunner> = runners.iter().filter(|r| !r.finished).collect();
        running.sort_by(|a, b| b.distance.total_cmp(&a.distance));
        for (position, runner) in running.iter().enumerate() {
            ranks.insert(runner.track_id, self.results.len() + position + 1);
        }

        let leader_distance = runners
            .iter()
            .find(|r| ranks.get(&r.track_id) == Some(&1))
            .map_or(0.0, |r| r.distance);
        let gaps = runners
            .iter()
            .map(|r| {
                let gap = if ranks.get(&r.track_id) == Some(&1) {
                    0.0
                } else {
                    ((leader_distance - r.distance) * 1000.0).max(0.0)
                };
                (r.track_id, gap)
            })
            .collect();

        RaceFrame {
            state: self.state,
            virtual_time: self.virtual_time,
            runners,
            ranks,
            gaps,
            new_results,
        }
    }

    fn runner(&self, track: &Track, finished: bool) -> Option<RaceRunner> {
        let last = track.points().last().copied();
        let point = if finished {
            last
        } else {
            point_at_time(track, self.virtual_time).or(last)
        }?;

        Some(RaceRunner {
            track_id: track.id,
            position: point.geo_point(),
            distance: point.cumulative_distance,
            current_pace: self.rolling_pace(track, &point),
            color: track.color.clone(),
            finished,
        })
    }

    /// Pace over the trailing window of distance behind `now`.
    fn rolling_pace(&self, track: &Track, now: &TrackPoint) -> f64 {
        let from = (now.cumulative_distance - self.config.rolling_pace_window_km).max(0.0);
        match point_at_distance(track, from) {
            Some(earlier) => pace_min_per_km(
                now.timestamp - earlier.timestamp,
                now.cumulative_distance - earlier.cumulative_distance,
            ),
            None => 0.0,
        }
    }
}
