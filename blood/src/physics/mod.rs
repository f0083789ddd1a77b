//! Collision queries the simulation needs from a host physics engine.
//!
//! The simulation never owns bodies or colliders. It refers to them by id and
//! asks a [`CollisionWorld`] for sweeps, overlaps, penetrations and poses every
//! tick. A `None` from a pose query means the collider no longer exists.

pub mod analytic;
#[cfg(feature = "rapier")]
pub mod rapier;

use std::ops::BitOr;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Handle to a collider owned by the host engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId(pub u64);

/// Handle to whatever owns a group of colliders (a creature, a ragdoll).
///
/// Drops and bleeders keep one of these so they can be dropped when the owner
/// despawns. It is a weak reference: nothing here keeps the owner alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub u64);

/// Bit set of collision layers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const NONE: LayerMask = LayerMask(0);
    pub const ALL: LayerMask = LayerMask(u32::MAX);

    /// Mask with only layer `index` set.
    pub const fn layer(index: u32) -> Self {
        LayerMask(1 << index)
    }

    #[inline]
    pub fn intersects(self, other: LayerMask) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LayerMask {
    type Output = LayerMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        LayerMask(self.0 | rhs.0)
    }
}

/// Which layers a drop sticks to and which layers end it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionLayers {
    /// Skin and bodies: drops adhere and slide.
    pub surface: LayerMask,
    /// Static world: drops stop and leave a mark.
    pub environment: LayerMask,
}

impl CollisionLayers {
    pub fn new(surface: LayerMask, environment: LayerMask) -> Self {
        Self {
            surface,
            environment,
        }
    }

    #[inline]
    pub fn combined(&self) -> LayerMask {
        self.surface | self.environment
    }

    /// True when a collider on `layers` should terminate a falling drop.
    #[inline]
    pub fn is_environment(&self, layers: LayerMask) -> bool {
        layers.intersects(self.environment)
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self::new(layers::BODY, layers::ENVIRONMENT)
    }
}

/// Default layer assignment used by the analytic world and the sandbox.
pub mod layers {
    use super::LayerMask;

    pub const ENVIRONMENT: LayerMask = LayerMask::layer(0);
    pub const BODY: LayerMask = LayerMask::layer(1);
}

/// First contact of a sphere sweep.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepHit {
    /// Contact point on the hit collider's surface.
    pub point: Vec3,
    /// Surface normal at the contact, pointing away from the collider.
    pub normal: Vec3,
    pub collider: ColliderId,
    /// Distance the sphere travelled before touching.
    pub distance: f32,
}

/// Minimal translation that separates a sphere from a collider.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Penetration {
    /// Unit direction to push the sphere along.
    pub direction: Vec3,
    pub distance: f32,
}

impl Penetration {
    #[inline]
    pub fn offset(&self) -> Vec3 {
        self.direction * self.distance
    }
}

/// Queries a host physics engine answers for the simulation.
///
/// All calls are synchronous and must not retain references past the call.
pub trait CollisionWorld {
    fn gravity(&self) -> Vec3;

    /// Casts a sphere of `radius` from `origin` along unit `direction`.
    fn sweep_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SweepHit>;

    /// Pushes every collider on `mask` overlapping the sphere into `out`.
    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask, out: &mut Vec<ColliderId>);

    /// Penetration of a sphere at `center` into `collider` at its current pose.
    fn compute_penetration(
        &self,
        center: Vec3,
        radius: f32,
        collider: ColliderId,
    ) -> Option<Penetration>;

    /// Closest point on the collider's surface (or inside it) to `point`.
    fn closest_point(&self, collider: ColliderId, point: Vec3) -> Option<Vec3>;

    /// Current world pose, `None` once the collider is gone.
    fn collider_transform(&self, collider: ColliderId) -> Option<Transform>;

    /// Velocity of the body owning `collider` at `point`; zero when static.
    fn point_velocity(&self, collider: ColliderId, point: Vec3) -> Vec3;

    fn layers_of(&self, collider: ColliderId) -> LayerMask;

    /// Owner that should dispose drops stuck to this collider.
    fn owner_of(&self, _collider: ColliderId) -> Option<OwnerId> {
        None
    }

    fn local_to_world(&self, collider: ColliderId, local: Vec3) -> Option<Vec3> {
        self.collider_transform(collider)
            .map(|transform| transform.transform_point(local))
    }

    fn world_to_local(&self, collider: ColliderId, world: Vec3) -> Option<Vec3> {
        self.collider_transform(collider)
            .map(|transform| transform.compute_affine().inverse().transform_point3(world))
    }

    fn is_alive(&self, collider: ColliderId) -> bool {
        self.collider_transform(collider).is_some()
    }
}

#[inline]
pub fn any_nan(vector: Vec3) -> bool {
    vector.x.is_nan() || vector.y.is_nan() || vector.z.is_nan()
}
