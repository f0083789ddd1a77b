//! Surface-adherent drops: wobble, depenetration, drag, re-projection and dripping.

use bevy::prelude::*;

use super::scheduler::UpdateScheduler;
use super::{DropStore, StepContext, TickReport};
use crate::constants::{
    COLLISION_RADIUS, DRIP_SPEED_THRESHOLD, NOISE_FULL_SPEED, NOISE_MAX_ANGLE_DEGREES,
    NOISE_SCALE, PENETRATION_EPSILON, SURFACE_DRAG,
};
use crate::drops::{FallingDrop, SurfaceDrop};
use crate::physics::{any_nan, CollisionWorld};
use crate::random::{inverse_lerp, SurfaceNoise};

/// Result of stepping one surface drop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SurfaceStep {
    /// The drop's collider no longer exists.
    Stale,
    /// The drop hung still long enough and fell off.
    Dripped(FallingDrop),
    Moved,
}

/// Ages every surface drop and gives the scheduled ones a full step.
///
/// `due` is scratch space for the scheduler.
pub fn update_surface_drops<W: CollisionWorld + ?Sized>(
    store: &mut DropStore,
    scheduler: &mut UpdateScheduler,
    due: &mut Vec<usize>,
    ctx: &mut StepContext,
    world: &W,
    dt: f32,
    report: &mut TickReport,
) {
    report.removed += store.surface.retain_swap(|drop| {
        drop.lifetime -= dt;
        !drop.is_expired()
    });

    scheduler.select(
        store.surface.len(),
        ctx.config.max_surface_updates_per_tick,
        dt,
        due,
    );
    // Descending, so a swap-removal only moves an already visited drop.
    due.sort_unstable_by(|a, b| b.cmp(a));
    due.dedup();

    for &index in due.iter() {
        let Some(drop) = store.surface.get_mut(index) else {
            continue;
        };

        match step_surface_drop(drop, ctx, world, dt) {
            SurfaceStep::Moved => report.updated += 1,
            SurfaceStep::Stale => {
                store.surface.swap_remove(index);
                report.removed += 1;
            }
            SurfaceStep::Dripped(falling) => {
                store.surface.swap_remove(index);
                store.falling.push(falling);
                report.dripped += 1;
            }
        }
    }
}

/// Advances one surface drop by `dt`.
pub fn step_surface_drop<W: CollisionWorld + ?Sized>(
    drop: &mut SurfaceDrop,
    ctx: &mut StepContext,
    world: &W,
    dt: f32,
) -> SurfaceStep {
    if !world.is_alive(drop.collider()) {
        return SurfaceStep::Stale;
    }

    let gravity = world.gravity();
    let gravity_dir = gravity.normalize_or_zero();

    drop.velocity = wobble(ctx.noise, drop, gravity_dir) * drop.velocity;

    let Some(mut position) = drop.contact.world_position(world) else {
        return SurfaceStep::Stale;
    };
    let previous = position;

    drop.velocity += gravity * dt;
    depenetrate(drop, &mut position, ctx, world, gravity_dir);

    let drag = 1.0 - dt * SURFACE_DRAG * ctx.config.friction_multiplier;
    drop.velocity *= drag.max(0.0);
    position += drop.velocity * dt;

    if !depenetrate(drop, &mut position, ctx, world, gravity_dir) {
        let collider = drop.collider();
        if let Some(closest) = world.closest_point(collider, position) {
            if let Some(normal) = (position - closest).try_normalize() {
                drop.contact.normal = normal;
            }
            drop.contact.rehome(world, collider, closest);
            position = closest;
        }
    }

    let surface_speed = previous.distance(position);
    drop.contact.distance_travelled += surface_speed;
    drop.contact.surface_speed = surface_speed;

    if let Some(timer) = drop.drip.as_mut() {
        let hanging = drop.contact.normal.dot(gravity_dir) > 0.0;
        if surface_speed < DRIP_SPEED_THRESHOLD * dt && hanging {
            if timer.tick(dt) {
                let velocity = world.point_velocity(drop.collider(), position);
                return SurfaceStep::Dripped(FallingDrop::new(
                    position,
                    velocity,
                    drop.size,
                    drop.lifetime,
                ));
            }
        } else {
            timer.reset();
        }
    }

    drop.decal_tick = ctx.tick;
    SurfaceStep::Moved
}

/// Small rotation of the velocity, smooth along the path travelled.
///
/// Drops on steep surfaces and fast drops wobble most; a drop hanging
/// straight down or lying flat barely does.
fn wobble(noise: &SurfaceNoise, drop: &SurfaceDrop, gravity_dir: Vec3) -> Quat {
    let steepness = drop
        .contact
        .normal
        .dot(gravity_dir)
        .abs()
        .clamp(0.0, 1.0)
        .acos();
    let weight = steepness * inverse_lerp(0.0, NOISE_FULL_SPEED, drop.velocity.length());
    if weight == 0.0 {
        return Quat::IDENTITY;
    }

    let angles = noise.sample_vec3(drop.contact.distance_travelled * NOISE_SCALE)
        * weight
        * NOISE_MAX_ANGLE_DEGREES.to_radians();
    Quat::from_euler(EulerRot::YXZ, angles.y, angles.x, angles.z)
}

/// Pushes the drop out of every adherable collider it overlaps.
///
/// Each resolved penetration strips the velocity's component into that
/// surface and moves the drop onto that collider; the last one wins.
/// Returns true if anything was resolved.
fn depenetrate<W: CollisionWorld + ?Sized>(
    drop: &mut SurfaceDrop,
    position: &mut Vec3,
    ctx: &mut StepContext,
    world: &W,
    gravity_dir: Vec3,
) -> bool {
    ctx.overlaps.clear();
    world.overlap_sphere(*position, COLLISION_RADIUS, ctx.layers.surface, ctx.overlaps);

    let mut resolved = false;
    for &collider in ctx.overlaps.iter() {
        let Some(penetration) = world.compute_penetration(*position, COLLISION_RADIUS, collider)
        else {
            continue;
        };
        if penetration.distance.abs() < PENETRATION_EPSILON {
            continue;
        }
        let offset = penetration.offset();
        if any_nan(offset) {
            continue;
        }
        let Some(direction) = penetration.direction.try_normalize() else {
            continue;
        };

        *position += offset;
        drop.velocity = drop.velocity.reject_from_normalized(direction);
        drop.contact.rehome(world, collider, *position);
        resolved = true;
    }

    if resolved {
        // Best guess of the surface normal from motion alone.
        let velocity_dir = drop.velocity.normalize_or_zero();
        if let Some(tangent) = velocity_dir.cross(gravity_dir).try_normalize() {
            drop.contact.normal = velocity_dir.cross(tangent);
        }
    }

    resolved
}
