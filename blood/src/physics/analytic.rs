//! In-memory collision world made of spheres, oriented boxes and planes.
//!
//! Shapes are evaluated through exact signed distance functions, which gives
//! exact closest points and penetrations and lets sphere casts run as
//! conservative advancement. Colliders carry a rigid pose plus a constant
//! linear and angular velocity that [`AnalyticWorld::advance`] integrates, so a
//! test can move a body under its drops.

use std::collections::BTreeMap;

use bevy::math::bounding::Aabb3d;
use bevy::prelude::*;
use bevy_ecs::resource::Resource;

use super::{
    layers, ColliderId, CollisionWorld, LayerMask, OwnerId, Penetration, SweepHit,
};

/// Distance under which a marching sphere counts as touching.
const SWEEP_TOLERANCE: f32 = 1e-5;
/// Iteration cap for one collider during a sweep.
const SWEEP_MAX_STEPS: usize = 64;
/// Half size of the box reported as the bounds of an infinite plane.
const PLANE_BOUNDS_HALF_EXTENT: Vec3 = Vec3::new(5.0, 0.05, 5.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
    /// Solid half space below the local XZ plane; the local +Y axis is the normal.
    HalfSpace,
}

impl Shape {
    /// Signed distance from a local point to the surface, negative inside.
    fn signed_distance(&self, local: Vec3) -> f32 {
        match *self {
            Shape::Sphere { radius } => local.length() - radius,
            Shape::Cuboid { half_extents } => {
                let q = local.abs() - half_extents;
                q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
            }
            Shape::HalfSpace => local.y,
        }
    }

    /// Nearest surface point and the outward normal there.
    fn project(&self, local: Vec3) -> (Vec3, Vec3) {
        match *self {
            Shape::Sphere { radius } => {
                let normal = local.try_normalize().unwrap_or(Vec3::Y);
                (normal * radius, normal)
            }
            Shape::Cuboid { half_extents } => {
                let clamped = local.clamp(-half_extents, half_extents);
                if clamped != local {
                    let normal = (local - clamped).try_normalize().unwrap_or(Vec3::Y);
                    return (clamped, normal);
                }

                // Inside: leave through the nearest face.
                let gap = half_extents - local.abs();
                let axis = if gap.x <= gap.y && gap.x <= gap.z {
                    0
                } else if gap.y <= gap.z {
                    1
                } else {
                    2
                };
                let sign = if local[axis] < 0.0 { -1.0 } else { 1.0 };
                let mut point = local;
                point[axis] = sign * half_extents[axis];
                let mut normal = Vec3::ZERO;
                normal[axis] = sign;
                (point, normal)
            }
            Shape::HalfSpace => (Vec3::new(local.x, 0.0, local.z), Vec3::Y),
        }
    }

    fn local_half_extents(&self) -> Vec3 {
        match *self {
            Shape::Sphere { radius } => Vec3::splat(radius),
            Shape::Cuboid { half_extents } => half_extents,
            Shape::HalfSpace => PLANE_BOUNDS_HALF_EXTENT,
        }
    }
}

/// One collider of an [`AnalyticWorld`].
#[derive(Clone, Debug)]
pub struct AnalyticCollider {
    pub shape: Shape,
    pub translation: Vec3,
    pub rotation: Quat,
    pub layers: LayerMask,
    pub owner: Option<OwnerId>,
    pub linear_velocity: Vec3,
    /// Angular velocity as a scaled axis (rad/s).
    pub angular_velocity: Vec3,
    pub enabled: bool,
}

impl AnalyticCollider {
    fn new(shape: Shape, translation: Vec3, layers: LayerMask) -> Self {
        Self {
            shape,
            translation,
            rotation: Quat::IDENTITY,
            layers,
            owner: None,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            enabled: true,
        }
    }

    pub fn sphere(center: Vec3, radius: f32) -> Self {
        Self::new(Shape::Sphere { radius }, center, layers::BODY)
    }

    pub fn cuboid(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(Shape::Cuboid { half_extents }, center, layers::BODY)
    }

    /// Infinite ground-like plane through `point`, solid on the side opposite `normal`.
    pub fn plane(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);
        let mut collider = Self::new(Shape::HalfSpace, point, layers::ENVIRONMENT);
        collider.rotation = Quat::from_rotation_arc(Vec3::Y, normal);
        collider
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_layers(mut self, layers: LayerMask) -> Self {
        self.layers = layers;
        self
    }

    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    pub fn transform(&self) -> Transform {
        Transform::from_translation(self.translation).with_rotation(self.rotation)
    }

    #[inline]
    fn to_local(&self, world: Vec3) -> Vec3 {
        self.rotation.inverse() * (world - self.translation)
    }

    #[inline]
    fn signed_distance(&self, world: Vec3) -> f32 {
        self.shape.signed_distance(self.to_local(world))
    }

    /// World-space surface point nearest to `world` and the outward normal there.
    fn project(&self, world: Vec3) -> (Vec3, Vec3) {
        let (point, normal) = self.shape.project(self.to_local(world));
        (
            self.translation + self.rotation * point,
            (self.rotation * normal).normalize_or_zero(),
        )
    }

    pub fn bounds(&self) -> Aabb3d {
        let half = self.shape.local_half_extents();
        let basis = Mat3::from_quat(self.rotation);
        let world_half = basis.x_axis.abs() * half.x
            + basis.y_axis.abs() * half.y
            + basis.z_axis.abs() * half.z;
        Aabb3d::new(self.translation, world_half)
    }

    /// Marches a sphere against this collider alone.
    fn cast(&self, origin: Vec3, radius: f32, direction: Vec3, max_distance: f32) -> Option<f32> {
        let mut travelled = 0.0;
        for _ in 0..SWEEP_MAX_STEPS {
            let gap = self.signed_distance(origin + direction * travelled) - radius;
            if gap <= SWEEP_TOLERANCE {
                return Some(travelled);
            }
            travelled += gap;
            if travelled > max_distance {
                return None;
            }
        }
        None
    }
}

/// Reference [`CollisionWorld`] used by tests and the sandbox.
#[derive(Resource, Debug, Clone)]
pub struct AnalyticWorld {
    gravity: Vec3,
    colliders: BTreeMap<ColliderId, AnalyticCollider>,
    next_id: u64,
}

impl Default for AnalyticWorld {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, -9.81, 0.0))
    }
}

impl AnalyticWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            colliders: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn insert(&mut self, collider: AnalyticCollider) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.colliders.insert(id, collider);
        id
    }

    pub fn remove(&mut self, id: ColliderId) -> Option<AnalyticCollider> {
        self.colliders.remove(&id)
    }

    /// Removes every collider belonging to `owner`, returning how many went.
    pub fn remove_owner(&mut self, owner: OwnerId) -> usize {
        let before = self.colliders.len();
        self.colliders
            .retain(|_, collider| collider.owner != Some(owner));
        before - self.colliders.len()
    }

    pub fn get(&self, id: ColliderId) -> Option<&AnalyticCollider> {
        self.colliders.get(&id)
    }

    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut AnalyticCollider> {
        self.colliders.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColliderId, &AnalyticCollider)> {
        self.colliders.iter().map(|(id, collider)| (*id, collider))
    }

    pub fn bounds(&self, id: ColliderId) -> Option<Aabb3d> {
        self.active(id).map(AnalyticCollider::bounds)
    }

    /// Moves every collider along its velocities.
    pub fn advance(&mut self, dt: f32) {
        for collider in self.colliders.values_mut() {
            collider.translation += collider.linear_velocity * dt;
            if collider.angular_velocity != Vec3::ZERO {
                collider.rotation = (Quat::from_scaled_axis(collider.angular_velocity * dt)
                    * collider.rotation)
                    .normalize();
            }
        }
    }

    fn active(&self, id: ColliderId) -> Option<&AnalyticCollider> {
        self.colliders.get(&id).filter(|collider| collider.enabled)
    }

    fn candidates(&self, mask: LayerMask) -> impl Iterator<Item = (ColliderId, &AnalyticCollider)> {
        self.colliders
            .iter()
            .filter(move |(_, collider)| collider.enabled && collider.layers.intersects(mask))
            .map(|(id, collider)| (*id, collider))
    }
}

impl CollisionWorld for AnalyticWorld {
    fn gravity(&self) -> Vec3 {
        self.gravity
    }

    fn sweep_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SweepHit> {
        let direction = direction.try_normalize()?;

        let mut best: Option<(f32, ColliderId)> = None;
        for (id, collider) in self.candidates(mask) {
            // Colliders the sphere starts inside are not reported.
            if collider.signed_distance(origin) < radius {
                continue;
            }
            if let Some(distance) = collider.cast(origin, radius, direction, max_distance) {
                if best.map_or(true, |(closest, _)| distance < closest) {
                    best = Some((distance, id));
                }
            }
        }

        let (distance, collider) = best?;
        let center = origin + direction * distance;
        let (point, normal) = self.active(collider)?.project(center);
        Some(SweepHit {
            point,
            normal,
            collider,
            distance,
        })
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask, out: &mut Vec<ColliderId>) {
        for (id, collider) in self.candidates(mask) {
            if collider.signed_distance(center) < radius {
                out.push(id);
            }
        }
    }

    fn compute_penetration(
        &self,
        center: Vec3,
        radius: f32,
        collider: ColliderId,
    ) -> Option<Penetration> {
        let collider = self.active(collider)?;
        let distance = radius - collider.signed_distance(center);
        if distance <= 0.0 {
            return None;
        }
        let (_, normal) = collider.project(center);
        Some(Penetration {
            direction: normal,
            distance,
        })
    }

    fn closest_point(&self, collider: ColliderId, point: Vec3) -> Option<Vec3> {
        let collider = self.active(collider)?;
        if collider.signed_distance(point) <= 0.0 {
            return Some(point);
        }
        Some(collider.project(point).0)
    }

    fn collider_transform(&self, collider: ColliderId) -> Option<Transform> {
        self.active(collider).map(AnalyticCollider::transform)
    }

    fn point_velocity(&self, collider: ColliderId, point: Vec3) -> Vec3 {
        self.active(collider)
            .map(|collider| {
                collider.linear_velocity
                    + collider
                        .angular_velocity
                        .cross(point - collider.translation)
            })
            .unwrap_or(Vec3::ZERO)
    }

    fn layers_of(&self, collider: ColliderId) -> LayerMask {
        self.active(collider)
            .map(|collider| collider.layers)
            .unwrap_or(LayerMask::NONE)
    }

    fn owner_of(&self, collider: ColliderId) -> Option<OwnerId> {
        self.active(collider).and_then(|collider| collider.owner)
    }
}
