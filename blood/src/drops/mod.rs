//! Plain data records for wounds and drops.
//!
//! Nothing here owns collision state. Positions that must follow a moving
//! body are stored in the body's local frame and resolved through a
//! [`CollisionWorld`] when needed.

use bevy::prelude::*;

use crate::physics::{ColliderId, CollisionWorld, OwnerId};
use crate::random::inverse_lerp;

/// Speed at which a falling drop reaches its longest stretch (m/s).
const STRETCH_FULL_SPEED: f32 = 4.0;
const STRETCH_MAX: f32 = 3.5;

/// What opened a bleeder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BleederKind {
    #[default]
    Wound,
    Nose,
    Mouth,
}

/// A wound that periodically emits drops.
#[derive(Clone, Debug)]
pub struct Bleeder {
    pub kind: BleederKind,
    /// Collider the wound is anchored to.
    pub collider: ColliderId,
    /// Anchor pose in the collider's local frame.
    pub local_anchor: Transform,
    /// Width (local X) and depth (local Z) of the area drops spawn in.
    pub dimensions: Vec2,
    pub frequency_multiplier: f32,
    pub size_multiplier: f32,
    /// Seconds until the next emission.
    pub next_emission: f32,
    /// Seconds until the wound closes.
    pub lifetime: f32,
    pub owner: Option<OwnerId>,
}

impl Bleeder {
    /// World pose of the anchor, `None` once the collider is gone.
    pub fn anchor<W: CollisionWorld + ?Sized>(&self, world: &W) -> Option<Transform> {
        world
            .collider_transform(self.collider)
            .map(|transform| transform.mul_transform(self.local_anchor))
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }
}

/// A free particle under gravity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FallingDrop {
    pub position: Vec3,
    pub velocity: Vec3,
    pub size: f32,
    pub lifetime: f32,
}

impl FallingDrop {
    pub fn new(position: Vec3, velocity: Vec3, size: f32, lifetime: f32) -> Self {
        Self {
            position,
            velocity,
            size,
            lifetime,
        }
    }

    /// Length scale along the velocity for drawing the drop in flight.
    pub fn stretch(&self) -> f32 {
        let t = inverse_lerp(0.0, STRETCH_FULL_SPEED, self.velocity.length());
        1.0 + (STRETCH_MAX - 1.0) * t
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }
}

/// Time a surface drop has to hang still before it falls off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DripTimer {
    pub total: f32,
    pub remaining: f32,
}

impl DripTimer {
    pub fn new(total: f32) -> Self {
        Self {
            total,
            remaining: total,
        }
    }

    /// Counts down by `dt`; true once the timer has run out.
    pub fn tick(&mut self, dt: f32) -> bool {
        self.remaining -= dt;
        self.remaining <= 0.0
    }

    pub fn reset(&mut self) {
        self.remaining = self.total;
    }
}

/// Where a surface drop sits and what it learned about that surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceContact {
    pub collider: ColliderId,
    /// Position in the collider's local frame.
    pub local_position: Vec3,
    /// Last estimated surface normal, zero until one is known.
    pub normal: Vec3,
    /// Accumulated path length; drives the wobble noise.
    pub distance_travelled: f32,
    /// Distance moved during the last step.
    pub surface_speed: f32,
}

impl SurfaceContact {
    pub fn new(collider: ColliderId, local_position: Vec3, noise_phase: f32) -> Self {
        Self {
            collider,
            local_position,
            normal: Vec3::ZERO,
            distance_travelled: noise_phase,
            surface_speed: 0.0,
        }
    }

    pub fn world_position<W: CollisionWorld + ?Sized>(&self, world: &W) -> Option<Vec3> {
        world.local_to_world(self.collider, self.local_position)
    }

    /// Moves the contact onto `collider` at `world_position`.
    ///
    /// Returns false, leaving the contact untouched, if `collider` is gone.
    pub fn rehome<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        collider: ColliderId,
        world_position: Vec3,
    ) -> bool {
        match world.world_to_local(collider, world_position) {
            Some(local) => {
                self.collider = collider;
                self.local_position = local;
                true
            }
            None => false,
        }
    }
}

/// A drop stuck to a collider, sliding with it.
#[derive(Clone, Debug)]
pub struct SurfaceDrop {
    pub contact: SurfaceContact,
    /// World-space velocity.
    pub velocity: Vec3,
    pub size: f32,
    pub lifetime: f32,
    /// `None` for drops that never drip.
    pub drip: Option<DripTimer>,
    /// Last tick the drop moved on, zero if it never has. Its trail is
    /// repainted by the first decal pass after that tick.
    pub decal_tick: u64,
    pub owner: Option<OwnerId>,
}

impl SurfaceDrop {
    pub fn new(contact: SurfaceContact, velocity: Vec3, size: f32, lifetime: f32) -> Self {
        Self {
            contact,
            velocity,
            size,
            lifetime,
            drip: None,
            decal_tick: 0,
            owner: None,
        }
    }

    pub fn with_drip(mut self, total: f32) -> Self {
        self.drip = Some(DripTimer::new(total));
        self
    }

    pub fn with_owner(mut self, owner: Option<OwnerId>) -> Self {
        self.owner = owner;
        self
    }

    /// Moved after `tick`, so its trail has not been painted yet.
    pub fn moved_since(&self, tick: u64) -> bool {
        self.decal_tick > tick
    }

    #[inline]
    pub fn collider(&self) -> ColliderId {
        self.contact.collider
    }

    #[inline]
    pub fn is_expired(&self) -> bool {
        self.lifetime <= 0.0
    }
}

/// Impact of a falling drop on the static world, for the host to paint.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StaticMarkRequest {
    pub position: Vec3,
    pub normal: Vec3,
    /// Spin of the mark around its normal, in radians.
    pub angle: f32,
    pub size: f32,
}
