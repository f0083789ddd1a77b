use std::time::Duration;

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use bevy_app::ScheduleRunnerPlugin;
use bevy_log::info;
use blood::physics::analytic::AnalyticWorld;
use blood::sets::BleedingSet;
use blood::{BleedingConfig, BleedingPlugin, TICKS_PER_SECOND};

use crate::backend::TallyBackend;
use crate::scenario::{drive_scenario, record_stats, Scenario, ScenarioStats};

/// How the sandbox runs.
#[derive(Debug, Clone)]
pub struct SandboxSettings {
    /// Fixed ticks to simulate before exiting.
    pub ticks: u64,
    /// Tick on which the creature is removed.
    pub despawn_at: Option<u64>,
    /// Pace the loop at the fixed rate instead of running flat out.
    pub realtime: bool,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            ticks: 500,
            despawn_at: Some(400),
            realtime: false,
        }
    }
}

#[derive(Resource)]
struct TickLimit(u64);

/// Headless app with the bleeding plugin and the scripted scenario, no logging.
pub fn build_app(config: BleedingConfig, settings: &SandboxSettings) -> App {
    let wait = if settings.realtime {
        Duration::from_secs_f64(1.0 / TICKS_PER_SECOND)
    } else {
        Duration::ZERO
    };

    let mut world = AnalyticWorld::default();
    let scenario = Scenario::build(&mut world, settings.despawn_at);

    let mut app = App::new();
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(wait)))
        .insert_resource(world)
        .insert_resource(scenario)
        .init_resource::<TallyBackend>()
        .init_resource::<ScenarioStats>()
        .insert_resource(TickLimit(settings.ticks))
        .add_plugins(BleedingPlugin::<AnalyticWorld, TallyBackend>::new(config))
        // Every frame is exactly one fixed tick.
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / TICKS_PER_SECOND,
        )))
        .add_systems(
            FixedUpdate,
            (
                drive_scenario.before(BleedingSet::Input),
                record_stats.after(BleedingSet::Output),
            ),
        )
        .add_systems(Last, exit_after_limit);
    app
}

fn exit_after_limit(
    limit: Res<TickLimit>,
    scenario: Res<Scenario>,
    mut exit: EventWriter<AppExit>,
) {
    if scenario.tick() >= limit.0 {
        exit.write(AppExit::Success);
    }
}

/// Runs the sandbox to completion with logging and returns the totals.
pub fn run(config: BleedingConfig, settings: &SandboxSettings) -> ScenarioStats {
    let mut app = build_app(config, settings);
    app.add_plugins(bevy_log::LogPlugin::default());

    info!("Running bleeding sandbox for {} ticks", settings.ticks);
    app.run();

    let stats = *app.world().resource::<ScenarioStats>();
    let backend = app.world().resource::<TallyBackend>();
    info!(
        "Done after {} ticks: {} hits, {} impact marks, peak {} surface drops, {} decal batches ({} segments)",
        stats.ticks,
        stats.hits,
        stats.static_marks,
        stats.peak_surface_drops,
        backend.batches,
        backend.segments
    );
    stats
}

#[cfg(test)]
mod tests {
    use blood::BleedingSimulation;

    use super::*;

    fn run_for(ticks: u64, despawn_at: Option<u64>) -> App {
        let settings = SandboxSettings {
            ticks,
            despawn_at,
            realtime: false,
        };
        let mut app = build_app(
            BleedingConfig {
                seed: Some(17),
                ..Default::default()
            },
            &settings,
        );
        // One extra frame: the first one only starts the clock.
        for _ in 0..=ticks {
            app.update();
        }
        app
    }

    #[test]
    fn test_scenario_bleeds_and_paints() {
        let app = run_for(150, None);

        let stats = app.world().resource::<ScenarioStats>();
        assert!(stats.ticks >= 149);
        assert_eq!(stats.hits, 5);
        assert!(stats.peak_bleeders >= 3);
        assert!(stats.peak_surface_drops > 0);

        let backend = app.world().resource::<TallyBackend>();
        assert!(backend.batches > 0);
    }

    #[test]
    fn test_despawn_clears_creature() {
        let app = run_for(120, Some(100));

        let stats = app.world().resource::<ScenarioStats>();
        assert!(stats.despawned);

        let simulation = app.world().resource::<BleedingSimulation>();
        assert!(simulation.bleeders().is_empty());
        assert!(simulation.surface_drops().is_empty());
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let a = run_for(100, None);
        let b = run_for(100, None);

        let stats_a = a.world().resource::<BleedingSimulation>().stats();
        let stats_b = b.world().resource::<BleedingSimulation>().stats();
        assert_eq!(stats_a, stats_b);
    }
}
