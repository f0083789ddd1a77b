//! A scripted fight: one creature standing on a floor takes a few hits, bleeds,
//! and is removed partway through the run.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;
use bevy_log::info;
use blood::physics::analytic::{AnalyticCollider, AnalyticWorld};
use blood::{
    BleedingHit, BleedingSimulation, BodyRegion, ColliderId, DamageKind, Face, Hit, OwnerDespawned,
    OwnerId, StaticMark,
};

use crate::backend::TallyBackend;

/// Ticks between two population log lines.
const LOG_INTERVAL: u64 = 50;

const ARM_SWING_SPEED: f32 = 0.3;

#[derive(Resource)]
pub struct Scenario {
    pub creature: OwnerId,
    pub torso: ColliderId,
    pub head: ColliderId,
    pub arm: ColliderId,
    /// Tick on which the creature is removed, if ever.
    pub despawn_at: Option<u64>,
    hits: Vec<(u64, Hit)>,
    tick: u64,
    despawned: bool,
}

/// Totals gathered while the scenario runs.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct ScenarioStats {
    pub ticks: u64,
    pub hits: usize,
    pub static_marks: usize,
    pub peak_surface_drops: usize,
    pub peak_bleeders: usize,
    pub despawned: bool,
}

impl Scenario {
    /// Builds the creature and floor in `world` and scripts the hits.
    pub fn build(world: &mut AnalyticWorld, despawn_at: Option<u64>) -> Self {
        let creature = OwnerId(1);
        world.insert(AnalyticCollider::plane(Vec3::ZERO, Vec3::Y));
        let torso = world.insert(
            AnalyticCollider::cuboid(Vec3::new(0.0, 1.2, 0.0), Vec3::new(0.2, 0.3, 0.12))
                .with_owner(creature),
        );
        let head = world.insert(
            AnalyticCollider::sphere(Vec3::new(0.0, 1.65, 0.0), 0.1).with_owner(creature),
        );
        let arm = world.insert(
            AnalyticCollider::cuboid(Vec3::new(0.3, 1.2, 0.0), Vec3::new(0.05, 0.25, 0.05))
                .with_owner(creature),
        );

        let face = Face {
            head,
            eyes: Transform::from_xyz(0.0, 1.65, 0.0),
            // Jaw bone points its X axis up the face.
            jaw: Some(Transform::from_xyz(0.0, 1.68, 0.0).with_rotation(Quat::from_rotation_z(FRAC_PI_2))),
        };
        let hit = |collider, point, normal, kind, region, intensity| Hit {
            owner: creature,
            collider,
            point,
            rotation: Quat::from_rotation_arc(Vec3::Y, normal),
            kind,
            region,
            intensity,
            face: Some(face),
        };

        let hits = vec![
            (
                5,
                hit(arm, Vec3::new(0.35, 1.3, 0.0), Vec3::X, DamageKind::Pierce, BodyRegion::Limb, 0.4),
            ),
            (
                20,
                hit(torso, Vec3::new(0.05, 1.35, 0.12), Vec3::Z, DamageKind::Slash, BodyRegion::Torso, 0.6),
            ),
            (
                40,
                hit(head, Vec3::new(0.0, 1.6, 0.09), Vec3::Z, DamageKind::Blunt, BodyRegion::Head, 0.7),
            ),
            (
                60,
                hit(torso, Vec3::new(-0.1, 1.1, 0.12), Vec3::Z, DamageKind::Pierce, BodyRegion::Torso, 0.5),
            ),
            (
                80,
                hit(head, Vec3::new(0.0, 1.74, 0.05), Vec3::Y, DamageKind::Other, BodyRegion::Head, 1.0),
            ),
        ];

        Self {
            creature,
            torso,
            head,
            arm,
            despawn_at,
            hits,
            tick: 0,
            despawned: false,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }
}

/// Moves the creature, lands scripted hits and removes the creature on schedule.
pub fn drive_scenario(
    mut scenario: ResMut<Scenario>,
    mut world: ResMut<AnalyticWorld>,
    mut backend: ResMut<TallyBackend>,
    mut stats: ResMut<ScenarioStats>,
    mut hits: EventWriter<BleedingHit>,
    mut despawned: EventWriter<OwnerDespawned>,
    time: Res<Time<Fixed>>,
) {
    scenario.tick += 1;
    let tick = scenario.tick;
    let dt = time.delta_secs();

    if !scenario.despawned {
        let swing = ARM_SWING_SPEED * (tick as f32 * dt * 2.0).cos();
        let arm = scenario.arm;
        if let Some(collider) = world.get_mut(arm) {
            collider.linear_velocity = Vec3::new(0.0, 0.0, swing);
        }
    }
    world.advance(dt);

    for (_, hit) in scenario.hits.iter().filter(|(at, _)| *at == tick) {
        hits.write(BleedingHit(*hit));
        stats.hits += 1;
    }

    if !scenario.despawned && scenario.despawn_at.is_some_and(|at| tick >= at) {
        let creature = scenario.creature;
        let removed = world.remove_owner(creature);
        despawned.write(OwnerDespawned(creature));
        scenario.despawned = true;
        stats.despawned = true;
        info!("Creature {:?} removed with {} colliders at tick {}", creature, removed, tick);
    }

    if backend.tracked() == 0 && !scenario.despawned {
        for collider in [scenario.torso, scenario.head, scenario.arm] {
            backend.track(&world, collider);
        }
    }
    backend.sync(&world);
}

/// Counts impact marks and logs the population now and then.
pub fn record_stats(
    scenario: Res<Scenario>,
    simulation: Res<BleedingSimulation>,
    mut marks: EventReader<StaticMark>,
    mut stats: ResMut<ScenarioStats>,
) {
    stats.static_marks += marks.read().count();
    stats.ticks = scenario.tick();

    let population = simulation.stats();
    stats.peak_surface_drops = stats.peak_surface_drops.max(population.surface_drops);
    stats.peak_bleeders = stats.peak_bleeders.max(population.bleeders);

    if population.tick % LOG_INTERVAL == 0 {
        info!(
            "Tick {}: {} bleeders, {} falling, {} on surfaces, {} marks so far",
            population.tick,
            population.bleeders,
            population.falling_drops,
            population.surface_drops,
            stats.static_marks
        );
    }
}
