//! The simulation context: every population, the RNG and the scheduler of
//! one independent bleeding simulation.

use bevy::prelude::*;
use bevy_ecs::resource::Resource;
use bevy_log::{debug, info};

use crate::config::BleedingConfig;
use crate::constants::{
    BLEEDER_LIFETIME_RANGE, DROP_LIFETIME_RANGE, MIN_BLEEDER_SPACING, SIZE_MULTIPLIER_MAX,
    SIZE_MULTIPLIER_MIN,
};
use crate::drops::{Bleeder, BleederKind, FallingDrop, StaticMarkRequest, SurfaceDrop};
use crate::physics::{ColliderId, CollisionLayers, CollisionWorld, OwnerId};
use crate::random::{DropRng, SurfaceNoise};
use crate::systems::disposal::{dispose_owner, Disposed};
use crate::systems::scheduler::UpdateScheduler;
use crate::systems::{bleeder, falling, surface, DropStore, StepContext, TickReport};

/// Parameters of a new wound.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BleederSpawn {
    pub kind: BleederKind,
    /// Collider the wound sticks to.
    pub collider: ColliderId,
    /// World pose of the wound; drops leave from its local XZ plane.
    pub anchor: Transform,
    pub dimensions: Vec2,
    pub frequency_multiplier: f32,
    pub size_multiplier: f32,
    pub duration_multiplier: f32,
    pub owner: Option<OwnerId>,
}

impl BleederSpawn {
    pub fn new(collider: ColliderId, anchor: Transform) -> Self {
        Self {
            kind: BleederKind::Wound,
            collider,
            anchor,
            dimensions: Vec2::splat(0.01),
            frequency_multiplier: 1.0,
            size_multiplier: 1.0,
            duration_multiplier: 1.0,
            owner: None,
        }
    }

    pub fn with_dimensions(mut self, dimensions: Vec2) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_multipliers(mut self, frequency: f32, size: f32, duration: f32) -> Self {
        self.frequency_multiplier = frequency;
        self.size_multiplier = size;
        self.duration_multiplier = duration;
        self
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_kind(mut self, kind: BleederKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Population counts, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BleedingStats {
    pub tick: u64,
    pub bleeders: usize,
    pub falling_drops: usize,
    pub surface_drops: usize,
    pub pending_marks: usize,
    pub last_tick: TickReport,
}

#[derive(Resource)]
pub struct BleedingSimulation {
    config: BleedingConfig,
    layers: CollisionLayers,
    store: DropStore,
    rng: DropRng,
    noise: SurfaceNoise,
    scheduler: UpdateScheduler,
    overlaps: Vec<ColliderId>,
    due: Vec<usize>,
    tick: u64,
    last_report: TickReport,
}

impl Default for BleedingSimulation {
    fn default() -> Self {
        Self::new(BleedingConfig::default())
    }
}

impl BleedingSimulation {
    pub fn new(config: BleedingConfig) -> Self {
        let rng = DropRng::new(config.seed);
        // Noise only needs to differ between seeds, not be secure.
        let noise = SurfaceNoise::new(config.seed.map_or(0, |seed| seed as u32));
        Self {
            scheduler: UpdateScheduler::new(config.scheduler),
            config,
            layers: CollisionLayers::default(),
            store: DropStore::default(),
            rng,
            noise,
            overlaps: Vec::with_capacity(32),
            due: Vec::with_capacity(64),
            tick: 0,
            last_report: TickReport::default(),
        }
    }

    pub fn with_layers(mut self, layers: CollisionLayers) -> Self {
        self.layers = layers;
        self
    }

    pub fn config(&self) -> &BleedingConfig {
        &self.config
    }

    /// Replaces the configuration, applying toggles immediately.
    pub fn set_config(&mut self, config: BleedingConfig) {
        self.scheduler.set_mode(config.scheduler);
        let wounds_enabled = config.wounds_enabled;
        self.config = BleedingConfig {
            wounds_enabled: self.config.wounds_enabled,
            ..config
        };
        self.set_wounds_enabled(wounds_enabled);
    }

    pub fn layers(&self) -> CollisionLayers {
        self.layers
    }

    pub fn set_layers(&mut self, layers: CollisionLayers) {
        self.layers = layers;
    }

    /// Physics ticks run so far; the decal pass uses it to paint each tick once.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn bleeders(&self) -> &[Bleeder] {
        self.store.bleeders.as_slice()
    }

    pub fn falling_drops(&self) -> &[FallingDrop] {
        self.store.falling.as_slice()
    }

    pub fn surface_drops(&self) -> &[SurfaceDrop] {
        self.store.surface.as_slice()
    }

    pub fn stats(&self) -> BleedingStats {
        BleedingStats {
            tick: self.tick,
            bleeders: self.store.bleeders.len(),
            falling_drops: self.store.falling.len(),
            surface_drops: self.store.surface.len(),
            pending_marks: self.store.static_marks.len(),
            last_tick: self.last_report,
        }
    }

    /// Enables or disables wound bleeding. Disabling drops every active bleeder.
    pub fn set_wounds_enabled(&mut self, enabled: bool) {
        let was_enabled = self.config.wounds_enabled;
        self.config.wounds_enabled = enabled;
        if !enabled {
            let cleared = self.store.bleeders.len();
            self.store.bleeders.clear();
            if was_enabled || cleared > 0 {
                info!("Wound bleeding disabled, cleared {} bleeders", cleared);
            }
        } else if !was_enabled {
            info!("Wound bleeding enabled");
        }
    }

    /// Starts a wound. Ignored while wound bleeding is disabled.
    pub fn spawn_bleeder<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        spawn: BleederSpawn,
    ) -> bool {
        if !self.config.wounds_enabled {
            return false;
        }
        self.insert_bleeder(world, spawn)
    }

    /// Like [`Self::spawn_bleeder`], but refuses a wound right next to an existing one.
    pub fn try_spawn_bleeder<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        spawn: BleederSpawn,
    ) -> bool {
        if self.has_bleeder_near(world, spawn.anchor.translation, MIN_BLEEDER_SPACING) {
            return false;
        }
        self.spawn_bleeder(world, spawn)
    }

    /// True if an active wound's anchor lies within `radius` of `position`.
    pub fn has_bleeder_near<W: CollisionWorld + ?Sized>(
        &self,
        world: &W,
        position: Vec3,
        radius: f32,
    ) -> bool {
        self.store.bleeders.iter().any(|bleeder| {
            bleeder.anchor(world).is_some_and(|anchor| {
                anchor.translation.distance_squared(position) < radius * radius
            })
        })
    }

    /// Adds a bleeder without consulting the wound toggle.
    pub(crate) fn insert_bleeder<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        spawn: BleederSpawn,
    ) -> bool {
        let Some(collider) = world.collider_transform(spawn.collider) else {
            return false;
        };
        let local_anchor = Transform::from_matrix(
            collider.compute_matrix().inverse() * spawn.anchor.compute_matrix(),
        );

        let lifetime = self.rng.range(BLEEDER_LIFETIME_RANGE)
            * spawn.duration_multiplier
            * self.config.duration_multiplier;

        self.store.bleeders.push(Bleeder {
            kind: spawn.kind,
            collider: spawn.collider,
            local_anchor,
            dimensions: spawn.dimensions,
            frequency_multiplier: spawn.frequency_multiplier,
            size_multiplier: spawn
                .size_multiplier
                .clamp(SIZE_MULTIPLIER_MIN, SIZE_MULTIPLIER_MAX),
            next_emission: 0.0,
            lifetime,
            owner: spawn.owner,
        })
    }

    /// Closes every bleeder `close` matches; returns how many were closed.
    pub(crate) fn close_bleeders(&mut self, mut close: impl FnMut(&Bleeder) -> bool) -> usize {
        self.store.bleeders.retain_swap(|bleeder| !close(bleeder))
    }

    /// Launches a free drop, e.g. from an external splash effect.
    pub fn spawn_falling_drop(&mut self, position: Vec3, velocity: Vec3, size: f32) -> bool {
        let lifetime = self.rng.range(DROP_LIFETIME_RANGE);
        self.store
            .falling
            .push(FallingDrop::new(position, velocity, size, lifetime))
    }

    /// Removes everything tied to `owner` right away.
    pub fn on_owner_despawned(&mut self, owner: OwnerId) -> Disposed {
        let disposed = dispose_owner(&mut self.store, owner);
        if disposed.total() > 0 {
            info!(
                "Owner {:?} despawned: removed {} bleeders and {} surface drops",
                owner, disposed.bleeders, disposed.surface_drops
            );
        }
        disposed
    }

    /// Environment impacts recorded since the last drain.
    ///
    /// At most `max_static_marks` are kept between drains.
    pub fn drain_static_marks(
        &mut self,
    ) -> std::collections::vec_deque::Drain<'_, StaticMarkRequest> {
        self.store.static_marks.drain(..)
    }

    /// Drops every wound, drop and pending mark.
    pub fn clear(&mut self) {
        self.store.clear();
    }

    /// Advances the whole simulation by one fixed tick.
    pub fn step<W: CollisionWorld + ?Sized>(&mut self, world: &W, dt: f32) -> TickReport {
        self.tick += 1;

        let mut report = TickReport::default();
        let mut ctx = StepContext {
            tick: self.tick,
            config: &self.config,
            layers: self.layers,
            rng: &mut self.rng,
            noise: &self.noise,
            overlaps: &mut self.overlaps,
        };

        report.emitted = bleeder::update_bleeders(&mut self.store, &mut ctx, world, dt);
        falling::update_falling(&mut self.store, &mut ctx, world, dt, &mut report);
        surface::update_surface_drops(
            &mut self.store,
            &mut self.scheduler,
            &mut self.due,
            &mut ctx,
            world,
            dt,
            &mut report,
        );

        if report.dripped > 0 || report.impacts > 0 {
            debug!(
                "Tick {}: {} dripped, {} hit the environment, {} surface drops",
                self.tick,
                report.dripped,
                report.impacts,
                self.store.surface.len()
            );
        }

        self.last_report = report;
        report
    }
}
