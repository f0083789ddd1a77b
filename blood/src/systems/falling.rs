//! Free fall: gravity integration with swept collision.

use std::f32::consts::TAU;

use bevy::prelude::*;

use super::{DropStore, StepContext, TickReport};
use crate::constants::{COLLISION_RADIUS, DRIP_TIME_RANGE, NOISE_PHASE_RANGE};
use crate::drops::{FallingDrop, StaticMarkRequest, SurfaceContact, SurfaceDrop};
use crate::physics::{CollisionWorld, SweepHit};

enum Landing {
    Airborne,
    Environment(SweepHit),
    Surface(SweepHit),
}

/// Advances every falling drop by `dt`.
///
/// Drops hitting the environment leave a [`StaticMarkRequest`] and end; drops
/// hitting an adherable collider become [`SurfaceDrop`]s.
pub fn update_falling<W: CollisionWorld + ?Sized>(
    store: &mut DropStore,
    ctx: &mut StepContext,
    world: &W,
    dt: f32,
    report: &mut TickReport,
) {
    let gravity = world.gravity();
    let mask = ctx.layers.combined();

    let mut index = store.falling.len();
    while index > 0 {
        index -= 1;

        let drop = &mut store.falling[index];
        drop.velocity += gravity * dt;

        let speed = drop.velocity.length();
        let landing = match (speed > 0.0)
            .then(|| {
                world.sweep_sphere(
                    drop.position,
                    COLLISION_RADIUS,
                    drop.velocity / speed,
                    speed * dt,
                    mask,
                )
            })
            .flatten()
        {
            Some(hit) if ctx.layers.is_environment(world.layers_of(hit.collider)) => {
                Landing::Environment(hit)
            }
            Some(hit) => Landing::Surface(hit),
            None => Landing::Airborne,
        };

        match landing {
            Landing::Airborne => {
                drop.position += drop.velocity * dt;
                drop.lifetime -= dt;
                if drop.is_expired() {
                    store.falling.swap_remove(index);
                    report.removed += 1;
                }
            }
            Landing::Environment(hit) => {
                let size = drop.size;
                let mark = StaticMarkRequest {
                    position: hit.point,
                    normal: hit.normal,
                    angle: ctx.rng.range(0.0..TAU),
                    size,
                };
                store.push_static_mark(mark, ctx.config.max_static_marks);
                store.falling.swap_remove(index);
                report.impacts += 1;
            }
            Landing::Surface(hit) => {
                let drop = *drop;
                store.falling.swap_remove(index);
                if let Some(surface_drop) = land(ctx, world, &drop, &hit) {
                    store.surface.push(surface_drop);
                    report.landed += 1;
                }
            }
        }
    }
}

/// Converts a falling drop into a drop stuck to the collider it hit.
pub fn land<W: CollisionWorld + ?Sized>(
    ctx: &mut StepContext,
    world: &W,
    drop: &FallingDrop,
    hit: &SweepHit,
) -> Option<SurfaceDrop> {
    let local = world.world_to_local(hit.collider, hit.point)?;
    let contact = SurfaceContact::new(hit.collider, local, ctx.rng.range(NOISE_PHASE_RANGE));
    Some(
        SurfaceDrop::new(contact, drop.velocity, drop.size, drop.lifetime)
            .with_drip(ctx.rng.range(DRIP_TIME_RANGE))
            .with_owner(world.owner_of(hit.collider)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BleedingConfig;
    use crate::physics::analytic::{AnalyticCollider, AnalyticWorld};
    use crate::physics::{layers, ColliderId, CollisionLayers, OwnerId};
    use crate::random::{DropRng, SurfaceNoise};

    const DT: f32 = 0.02;

    fn run(world: &AnalyticWorld, store: &mut DropStore, ticks: usize) -> TickReport {
        let config = BleedingConfig::default();
        let mut rng = DropRng::seeded(5);
        let noise = SurfaceNoise::default();
        let mut overlaps: Vec<ColliderId> = Vec::new();
        let mut report = TickReport::default();

        for _ in 0..ticks {
            let mut ctx = StepContext {
                tick: 1,
                config: &config,
                layers: CollisionLayers::default(),
                rng: &mut rng,
                noise: &noise,
                overlaps: &mut overlaps,
            };
            update_falling(store, &mut ctx, world, DT, &mut report);
        }
        report
    }

    #[test]
    fn test_unobstructed_speed_matches_gravity() {
        let world = AnalyticWorld::new(Vec3::new(0.0, -9.8, 0.0));
        let mut store = DropStore::default();
        let v0 = Vec3::new(1.0, 2.0, 0.0);
        store
            .falling
            .push(FallingDrop::new(Vec3::ZERO, v0, 0.01, 100.0));

        run(&world, &mut store, 50);

        let expected = (v0 + world.gravity() * (50.0 * DT)).length();
        assert!((store.falling[0].velocity.length() - expected).abs() < 1e-3);
    }

    #[test]
    fn test_drop_lands_on_body_plane_at_origin() {
        let mut world = AnalyticWorld::new(Vec3::new(0.0, -9.8, 0.0));
        let owner = OwnerId(1);
        let floor = world.insert(
            AnalyticCollider::plane(Vec3::ZERO, Vec3::Y)
                .with_layers(layers::BODY)
                .with_owner(owner),
        );
        let mut store = DropStore::default();
        store
            .falling
            .push(FallingDrop::new(Vec3::new(0.0, 5.0, 0.0), Vec3::ZERO, 0.01, 100.0));

        let report = run(&world, &mut store, 100);

        assert_eq!(report.landed, 1);
        assert!(store.falling.is_empty());
        assert_eq!(store.surface.len(), 1);
        let drop = &store.surface[0];
        assert_eq!(drop.collider(), floor);
        assert!(drop.contact.local_position.length() < 1e-4);
        assert_eq!(drop.contact.normal, Vec3::ZERO);
        assert_eq!(drop.owner, Some(owner));
        assert!(drop
            .drip
            .is_some_and(|timer| DRIP_TIME_RANGE.contains(&timer.total)));
    }

    #[test]
    fn test_environment_impact_requests_mark() {
        let mut world = AnalyticWorld::default();
        world.insert(AnalyticCollider::plane(Vec3::ZERO, Vec3::Y));
        let mut store = DropStore::default();
        store
            .falling
            .push(FallingDrop::new(Vec3::new(0.0, 1.0, 0.0), Vec3::ZERO, 0.02, 100.0));

        let report = run(&world, &mut store, 100);

        assert_eq!(report.impacts, 1);
        assert!(store.falling.is_empty());
        assert!(store.surface.is_empty());
        assert_eq!(store.static_marks.len(), 1);
        let mark = store.static_marks[0];
        assert!(mark.position.y.abs() < 1e-4);
        assert!((mark.normal - Vec3::Y).length() < 1e-4);
        assert_eq!(mark.size, 0.02);
    }

    #[test]
    fn test_falling_drop_expires() {
        let world = AnalyticWorld::default();
        let mut store = DropStore::default();
        store
            .falling
            .push(FallingDrop::new(Vec3::ZERO, Vec3::ZERO, 0.01, 0.1));

        let report = run(&world, &mut store, 10);

        assert_eq!(report.removed, 1);
        assert!(store.falling.is_empty());
    }
}
