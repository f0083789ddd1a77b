//! Bevy plugin running the bleeding simulation against a host collision world.

use std::marker::PhantomData;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_log::info;

use crate::config::BleedingConfig;
use crate::constants::TICKS_PER_SECOND;
use crate::decals::{DecalAggregator, DecalBackend};
use crate::drops::StaticMarkRequest;
use crate::physics::{CollisionWorld, OwnerId};
use crate::presets::{BleedPresets, Hit};
use crate::sets::{BleedingRenderSet, BleedingSet};
use crate::simulation::{BleederSpawn, BleedingSimulation};

/// Opens a wound directly, bypassing the hit presets.
#[derive(Event, Clone, Copy, Debug)]
pub struct SpawnBleeder(pub BleederSpawn);

/// A hit on a creature, run through the presets.
#[derive(Event, Clone, Copy, Debug)]
pub struct BleedingHit(pub Hit);

#[derive(Event, Clone, Copy, Debug)]
pub struct SpawnFallingDrop {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
}

/// Everything tied to this owner is removed on the next fixed tick.
#[derive(Event, Clone, Copy, Debug)]
pub struct OwnerDespawned(pub OwnerId);

/// A drop hit the static world; the host decides how to paint it.
#[derive(Event, Clone, Copy, Debug)]
pub struct StaticMark(pub StaticMarkRequest);

/// Runs the simulation against the collision world resource `W` and paints
/// trails through the decal backend resource `B`.
///
/// Both resources are provided by the host.
pub struct BleedingPlugin<W, B> {
    pub config: BleedingConfig,
    _marker: PhantomData<fn() -> (W, B)>,
}

impl<W, B> BleedingPlugin<W, B> {
    pub fn new(config: BleedingConfig) -> Self {
        Self {
            config,
            _marker: PhantomData,
        }
    }
}

impl<W, B> Default for BleedingPlugin<W, B> {
    fn default() -> Self {
        Self::new(BleedingConfig::default())
    }
}

impl<W, B> Plugin for BleedingPlugin<W, B>
where
    W: Resource + CollisionWorld,
    B: Resource + DecalBackend,
{
    fn build(&self, app: &mut App) {
        add_bleeding_core(app, &self.config);
        app.add_systems(
            FixedUpdate,
            (
                apply_inputs::<W>.in_set(BleedingSet::Input),
                step_simulation::<W>.in_set(BleedingSet::Simulate),
            ),
        )
        .add_systems(
            PostUpdate,
            paint_decals::<W, B>.in_set(BleedingRenderSet::Decals),
        );
    }
}

/// Resources, events, sets and the world-independent systems.
pub(crate) fn add_bleeding_core(app: &mut App, config: &BleedingConfig) {
    app.insert_resource(config.clone())
        .insert_resource(BleedingSimulation::new(config.clone()))
        .insert_resource(BleedPresets::new(config.seed))
        .insert_resource(Time::<Fixed>::from_hz(TICKS_PER_SECOND))
        .init_resource::<DecalAggregator>()
        .register_type::<BleedingConfig>()
        .add_event::<SpawnBleeder>()
        .add_event::<BleedingHit>()
        .add_event::<SpawnFallingDrop>()
        .add_event::<OwnerDespawned>()
        .add_event::<StaticMark>()
        .configure_sets(
            FixedUpdate,
            (
                BleedingSet::Input,
                BleedingSet::Simulate,
                BleedingSet::Output,
            )
                .chain(),
        )
        .add_systems(
            FixedUpdate,
            (
                sync_config.in_set(BleedingSet::Input).before(apply_despawns),
                apply_despawns.in_set(BleedingSet::Input),
                forward_static_marks.in_set(BleedingSet::Output),
            ),
        );
}

/// Event readers for everything that feeds the simulation.
#[derive(SystemParam)]
pub(crate) struct BleedingInputs<'w, 's> {
    hits: EventReader<'w, 's, BleedingHit>,
    bleeders: EventReader<'w, 's, SpawnBleeder>,
    drops: EventReader<'w, 's, SpawnFallingDrop>,
}

impl BleedingInputs<'_, '_> {
    pub(crate) fn apply<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        simulation: &mut BleedingSimulation,
        presets: &mut BleedPresets,
    ) {
        for BleedingHit(hit) in self.hits.read() {
            presets.on_hit(simulation, world, hit);
        }
        for SpawnBleeder(spawn) in self.bleeders.read() {
            simulation.spawn_bleeder(world, *spawn);
        }
        for drop in self.drops.read() {
            simulation.spawn_falling_drop(drop.position, drop.velocity, drop.size);
        }
    }
}

/// Pushes edits of the config resource into the simulation.
fn sync_config(config: Res<BleedingConfig>, mut simulation: ResMut<BleedingSimulation>) {
    if !config.is_changed() || simulation.config() == &*config {
        return;
    }
    simulation.set_config(config.clone());
    info!("Bleeding config updated");
}

fn apply_despawns(
    mut despawned: EventReader<OwnerDespawned>,
    mut simulation: ResMut<BleedingSimulation>,
    mut presets: ResMut<BleedPresets>,
) {
    for OwnerDespawned(owner) in despawned.read() {
        simulation.on_owner_despawned(*owner);
        presets.forget_owner(*owner);
    }
}

fn apply_inputs<W: Resource + CollisionWorld>(
    world: Res<W>,
    mut inputs: BleedingInputs,
    mut simulation: ResMut<BleedingSimulation>,
    mut presets: ResMut<BleedPresets>,
) {
    inputs.apply(&*world, &mut simulation, &mut presets);
}

/// Advances delayed bleeds and the simulation by one fixed tick.
pub(crate) fn advance<W: CollisionWorld + ?Sized>(
    world: &W,
    simulation: &mut BleedingSimulation,
    presets: &mut BleedPresets,
    dt: f32,
) {
    presets.update(simulation, world, dt);
    simulation.step(world, dt);
}

fn step_simulation<W: Resource + CollisionWorld>(
    world: Res<W>,
    mut simulation: ResMut<BleedingSimulation>,
    mut presets: ResMut<BleedPresets>,
    time: Res<Time<Fixed>>,
) {
    advance(&*world, &mut simulation, &mut presets, time.delta_secs());
}

fn forward_static_marks(
    mut simulation: ResMut<BleedingSimulation>,
    mut marks: EventWriter<StaticMark>,
) {
    marks.write_batch(simulation.drain_static_marks().map(StaticMark));
}

fn paint_decals<W: Resource + CollisionWorld, B: Resource + DecalBackend>(
    world: Res<W>,
    simulation: Res<BleedingSimulation>,
    mut aggregator: ResMut<DecalAggregator>,
    mut backend: ResMut<B>,
) {
    aggregator.aggregate(&simulation, &*world, &mut *backend);
}
