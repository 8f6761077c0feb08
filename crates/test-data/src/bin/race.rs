//! Replays a generated race to completion and logs the results.
//!
//! Run with:
//! ```
//! cargo run -p test-data --bin race
//! RACE_CONFIG='{"runners": 6, "seed": 7}' cargo run -p test-data --bin race
//! ```

use anyhow::{Context, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use test_data::config::RaceFieldConfig;
use test_data::profiles::{AthleteProfile, RunnerProfile};
use test_data::sources::{PALETTE, ProceduralGenerator};
use time::Duration;
use track_engine::stats::compute_stats_batch;
use track_engine::{ActivityType, EngineConfig, RaceSimulation, RaceState};
use tracing_subscriber::EnvFilter;

/// Virtual seconds between progress log lines.
const PROGRESS_EVERY_SECS: f64 = 300.0;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = RaceFieldConfig::from_env().context("invalid RACE_CONFIG")?;
    tracing::info!(?config, "Generating field");

    let profiles: Vec<RunnerProfile> = (0..config.runners)
        .map(|i| RunnerProfile::with_pace(4.0 + 0.4 * i as f64))
        .collect();
    let profile_refs: Vec<&dyn AthleteProfile> =
        profiles.iter().map(|p| p as &dyn AthleteProfile).collect();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let field = ProceduralGenerator::for_region(config.region, config.seed as u32)
        .with_distance(config.distance_meters)
        .with_pauses(0.002, 10.0, 45.0)
        .named("Runner", PALETTE[0])
        .generate_field(&profile_refs, &mut rng);

    let engine_config = EngineConfig::for_activity(ActivityType::Running);
    for (track, stats) in field.iter().zip(compute_stats_batch(&field, 5, &engine_config)) {
        tracing::info!(
            name = %track.name,
            km = %format!("{:.2}", stats.total_distance),
            pace = %format!("{:.2}", stats.avg_pace),
            pauses = stats.pauses.len(),
            avg_hr = ?stats.avg_heart_rate.map(|hr| hr.round()),
            "Entrant"
        );
    }

    let names: Vec<(uuid::Uuid, String)> = field.iter().map(|t| (t.id, t.name.clone())).collect();
    let name_of = |id: uuid::Uuid| {
        names
            .iter()
            .find(|(track_id, _)| *track_id == id)
            .map_or("?", |(_, name)| name.as_str())
    };

    let mut race = RaceSimulation::with_config(engine_config);
    if !race.set_speed_multiplier(config.speed_multiplier) {
        bail!("speed multiplier must be positive, got {}", config.speed_multiplier);
    }
    if !race.start(field) {
        bail!("a race needs at least two runners, got {}", config.runners);
    }

    let step = Duration::seconds_f64(config.tick_seconds);
    let mut next_report = PROGRESS_EVERY_SECS;
    while let Some(frame) = race.tick(step) {
        for result in &frame.new_results {
            tracing::info!(
                rank = result.rank,
                runner = name_of(result.track_id),
                finish = %format_clock(result.finish_time_offset),
                avg_kmh = %format!("{:.2}", result.avg_speed),
                "Finished"
            );
        }

        if frame.virtual_time.as_seconds_f64() >= next_report {
            next_report += PROGRESS_EVERY_SECS;
            if let Some(leader) = frame
                .runners
                .iter()
                .find(|r| frame.ranks.get(&r.track_id) == Some(&1))
            {
                tracing::debug!(
                    clock = %format_clock(frame.virtual_time),
                    leader = name_of(leader.track_id),
                    km = %format!("{:.2}", leader.distance),
                    pace = %format!("{:.2}", leader.current_pace),
                    "Progress"
                );
            }
        }

        if frame.state == RaceState::Finished {
            break;
        }
    }

    println!("{}", serde_json::to_string_pretty(race.results())?);
    Ok(())
}

fn format_clock(offset: Duration) -> String {
    let total = offset.whole_seconds();
    format!("{}:{:02}:{:02}", total / 3600, (total / 60) % 60, total % 60)
}
