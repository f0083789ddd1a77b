//! Emission: turns wounds into drops on a per-wound timer.

use bevy::prelude::*;

use super::{DropStore, StepContext};
use crate::constants::{
    ATTACH_RADIUS, BASE_DROP_SIZE, COLLISION_RADIUS, CONTACT_DISTANCE_SQ, DRIP_TIME_RANGE,
    DROP_LIFETIME_RANGE, EMISSION_INTERVAL_RANGE, LAUNCH_SPEED, NOISE_PHASE_RANGE,
};
use crate::drops::{Bleeder, FallingDrop, SurfaceContact, SurfaceDrop};
use crate::physics::{ColliderId, CollisionWorld, OwnerId};

/// A drop leaving a wound, before it is classified as falling or attached.
#[derive(Clone, Copy, Debug)]
pub struct Emission {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub owner: Option<OwnerId>,
}

/// Seconds until the next emission of `bleeder`.
pub fn roll_emission_interval(ctx: &mut StepContext, bleeder: &Bleeder) -> f32 {
    let rate = bleeder.frequency_multiplier.max(f32::EPSILON) * ctx.config.emission_rate();
    ctx.rng.range(EMISSION_INTERVAL_RANGE) / rate
}

/// Launch velocity with any component along gravity removed.
pub fn launch_velocity(ctx: &mut StepContext, gravity_dir: Vec3) -> Vec3 {
    let velocity = ctx.rng.inside_unit_sphere() * LAUNCH_SPEED;
    if velocity.dot(gravity_dir) > 0.0 {
        velocity.reject_from_normalized(gravity_dir)
    } else {
        velocity
    }
}

/// Advances every bleeder by `dt`, emitting the ones that are due.
///
/// Bleeders whose collider is gone or whose lifetime ran out are removed.
/// Returns how many drops were emitted.
pub fn update_bleeders<W: CollisionWorld + ?Sized>(
    store: &mut DropStore,
    ctx: &mut StepContext,
    world: &W,
    dt: f32,
) -> usize {
    let gravity_dir = world.gravity().normalize_or_zero();
    let mut emitted = 0;

    let mut index = store.bleeders.len();
    while index > 0 {
        index -= 1;

        let emission = {
            let bleeder = &mut store.bleeders[index];
            let Some(anchor) = bleeder.anchor(world) else {
                store.bleeders.swap_remove(index);
                continue;
            };

            bleeder.next_emission -= dt;
            let emission = if bleeder.next_emission <= 0.0 {
                let offset = Vec3::new(
                    ctx.rng.symmetric(bleeder.dimensions.x),
                    0.0,
                    ctx.rng.symmetric(bleeder.dimensions.y),
                ) * 0.5;
                let next = roll_emission_interval(ctx, bleeder);
                bleeder.next_emission = next;

                Some(Emission {
                    position: anchor.transform_point(offset),
                    velocity: launch_velocity(ctx, gravity_dir),
                    size: BASE_DROP_SIZE * bleeder.size_multiplier,
                    owner: bleeder.owner,
                })
            } else {
                None
            };

            bleeder.lifetime -= dt;
            if bleeder.is_expired() {
                store.bleeders.swap_remove(index);
            }
            emission
        };

        if let Some(emission) = emission {
            emit(store, ctx, world, emission);
            emitted += 1;
        }
    }

    emitted
}

/// Places an emitted drop: on the nearest adherable surface in reach, or in the air.
pub fn emit<W: CollisionWorld + ?Sized>(
    store: &mut DropStore,
    ctx: &mut StepContext,
    world: &W,
    emission: Emission,
) {
    let lifetime = ctx.rng.range(DROP_LIFETIME_RANGE);

    if let Some((collider, point)) = nearest_surface(ctx, world, emission.position) {
        if let Some(local) = world.world_to_local(collider, point) {
            let contact = SurfaceContact::new(collider, local, ctx.rng.range(NOISE_PHASE_RANGE));
            let drop = SurfaceDrop::new(contact, emission.velocity, emission.size, lifetime)
                .with_drip(ctx.rng.range(DRIP_TIME_RANGE))
                .with_owner(world.owner_of(collider).or(emission.owner));
            store.surface.push(drop);
            return;
        }
    }

    store.falling.push(FallingDrop::new(
        emission.position,
        emission.velocity,
        emission.size,
        lifetime,
    ));
}

/// Closest adherable surface point within [`ATTACH_RADIUS`] of `position`.
///
/// Points on or inside a collider are pushed out with a penetration query so
/// the drop starts resting on the surface.
pub fn nearest_surface<W: CollisionWorld + ?Sized>(
    ctx: &mut StepContext,
    world: &W,
    position: Vec3,
) -> Option<(ColliderId, Vec3)> {
    ctx.overlaps.clear();
    world.overlap_sphere(position, ATTACH_RADIUS, ctx.layers.surface, ctx.overlaps);

    let mut best: Option<(f32, ColliderId, Vec3)> = None;
    for &collider in ctx.overlaps.iter() {
        let Some(mut point) = world.closest_point(collider, position) else {
            continue;
        };
        let mut distance_sq = point.distance_squared(position);

        if distance_sq < CONTACT_DISTANCE_SQ {
            if let Some(penetration) = world.compute_penetration(position, COLLISION_RADIUS, collider)
            {
                distance_sq = penetration.distance * penetration.distance;
                point = position + penetration.offset();
            }
        }

        if best.map_or(true, |(closest, _, _)| distance_sq < closest) {
            best = Some((distance_sq, collider, point));
        }
    }

    best.map(|(_, collider, point)| (collider, point))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BleedingConfig;
    use crate::drops::BleederKind;
    use crate::physics::analytic::{AnalyticCollider, AnalyticWorld};
    use crate::physics::{layers, CollisionLayers};
    use crate::random::{DropRng, SurfaceNoise};

    struct Fixture {
        config: BleedingConfig,
        rng: DropRng,
        noise: SurfaceNoise,
        overlaps: Vec<ColliderId>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                config: BleedingConfig::default(),
                rng: DropRng::seeded(42),
                noise: SurfaceNoise::default(),
                overlaps: Vec::new(),
            }
        }

        fn ctx(&mut self) -> StepContext<'_> {
            StepContext {
                tick: 1,
                config: &self.config,
                layers: CollisionLayers::default(),
                rng: &mut self.rng,
                noise: &self.noise,
                overlaps: &mut self.overlaps,
            }
        }
    }

    fn bleeder_on(collider: ColliderId, anchor: Vec3) -> Bleeder {
        Bleeder {
            kind: BleederKind::Wound,
            collider,
            local_anchor: Transform::from_translation(anchor),
            dimensions: Vec2::ZERO,
            frequency_multiplier: 1.0,
            size_multiplier: 1.0,
            next_emission: 0.0,
            lifetime: 10.0,
            owner: None,
        }
    }

    #[test]
    fn test_point_emitter_spawns_at_anchor() {
        let mut world = AnalyticWorld::default();
        let post = world.insert(
            AnalyticCollider::cuboid(Vec3::ZERO, Vec3::splat(0.1)).with_layers(layers::ENVIRONMENT),
        );
        let mut store = DropStore::default();
        store.bleeders.push(bleeder_on(post, Vec3::new(0.0, 1.0, 0.0)));
        let mut fixture = Fixture::new();

        let emitted = update_bleeders(&mut store, &mut fixture.ctx(), &world, 0.02);

        assert_eq!(emitted, 1);
        assert_eq!(store.falling.len(), 1);
        assert_eq!(store.falling[0].position, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(store.falling[0].size, BASE_DROP_SIZE);
    }

    #[test]
    fn test_interval_rerolled_positive_and_non_increasing() {
        let mut world = AnalyticWorld::default();
        let post = world.insert(
            AnalyticCollider::cuboid(Vec3::ZERO, Vec3::splat(0.1)).with_layers(layers::ENVIRONMENT),
        );
        let mut store = DropStore::default();
        store.bleeders.push(bleeder_on(post, Vec3::new(0.0, 1.0, 0.0)));
        let mut fixture = Fixture::new();

        let mut previous = f32::MAX;
        let mut emissions = 0;
        for _ in 0..200 {
            emissions += update_bleeders(&mut store, &mut fixture.ctx(), &world, 0.02);
            let next = store.bleeders[0].next_emission;
            assert!(next > 0.0);
            if next > previous {
                // Only a fresh roll may raise the timer.
                assert!(next >= EMISSION_INTERVAL_RANGE.start - 0.02);
            }
            previous = next;
        }

        // 4 seconds at one emission per 1-2 seconds.
        assert!((2..=5).contains(&emissions));
    }

    #[test]
    fn test_launch_never_pushes_along_gravity() {
        let mut fixture = Fixture::new();
        let mut ctx = fixture.ctx();

        for _ in 0..256 {
            let velocity = launch_velocity(&mut ctx, Vec3::NEG_Y);
            assert!(velocity.y >= -1e-6);
            assert!(velocity.length() <= LAUNCH_SPEED + 1e-5);
        }
    }

    #[test]
    fn test_emission_attaches_to_nearby_body() {
        let mut world = AnalyticWorld::default();
        let owner = OwnerId(3);
        let arm = world.insert(AnalyticCollider::sphere(Vec3::ZERO, 0.5).with_owner(owner));
        let mut store = DropStore::default();
        store.bleeders.push(bleeder_on(arm, Vec3::new(0.0, 0.5, 0.0)));
        let mut fixture = Fixture::new();

        update_bleeders(&mut store, &mut fixture.ctx(), &world, 0.02);

        assert!(store.falling.is_empty());
        assert_eq!(store.surface.len(), 1);
        let drop = &store.surface[0];
        assert_eq!(drop.collider(), arm);
        assert_eq!(drop.owner, Some(owner));
        assert!(drop.drip.is_some());
        // Pushed out to rest on the surface.
        let height = drop.contact.local_position.length();
        assert!((height - (0.5 + COLLISION_RADIUS)).abs() < 1e-4);
    }

    #[test]
    fn test_bleeder_expires_and_stale_bleeder_removed() {
        let mut world = AnalyticWorld::default();
        let a = world.insert(AnalyticCollider::sphere(Vec3::ZERO, 0.5));
        let b = world.insert(AnalyticCollider::sphere(Vec3::new(3.0, 0.0, 0.0), 0.5));
        let mut store = DropStore::default();
        let mut short = bleeder_on(a, Vec3::new(0.0, 0.5, 0.0));
        short.lifetime = 0.01;
        store.bleeders.push(short);
        store.bleeders.push(bleeder_on(b, Vec3::new(0.0, 0.5, 0.0)));
        world.remove(b);
        let mut fixture = Fixture::new();

        update_bleeders(&mut store, &mut fixture.ctx(), &world, 0.02);

        assert!(store.bleeders.is_empty());
    }
}
