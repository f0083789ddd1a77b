//! Rapier integration: answers collision queries from a live Rapier scene.
//!
//! Colliders are addressed by entity. The collision group memberships of a
//! collider are its [`LayerMask`], so a host routes bodies and static world
//! onto the layers in [`CollisionLayers`](super::CollisionLayers).

use std::marker::PhantomData;

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_log::warn;
use bevy_rapier3d::prelude::*;

use super::{ColliderId, CollisionWorld, LayerMask, OwnerId, Penetration, SweepHit};
use crate::config::BleedingConfig;
use crate::decals::{DecalAggregator, DecalBackend};
use crate::plugin::{add_bleeding_core, advance, BleedingInputs};
use crate::presets::BleedPresets;
use crate::sets::{BleedingRenderSet, BleedingSet};
use crate::simulation::BleedingSimulation;

/// Creature or ragdoll a collider belongs to, for disposal.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BleedOwner(pub OwnerId);

impl ColliderId {
    pub fn from_entity(entity: Entity) -> Self {
        ColliderId(entity.to_bits())
    }

    pub fn entity(self) -> Option<Entity> {
        Entity::try_from_bits(self.0).ok()
    }
}

pub fn group_of(mask: LayerMask) -> Group {
    Group::from_bits_truncate(mask.0)
}

type ColliderQueryData = (
    &'static Collider,
    &'static GlobalTransform,
    Option<&'static CollisionGroups>,
    Option<&'static BleedOwner>,
    Option<&'static ChildOf>,
);

/// [`CollisionWorld`] over the default Rapier context.
#[derive(SystemParam)]
pub struct RapierCollisionWorld<'w, 's> {
    context: ReadRapierContext<'w, 's>,
    configuration: Query<'w, 's, &'static RapierConfiguration>,
    colliders: Query<'w, 's, ColliderQueryData>,
    bodies: Query<'w, 's, (&'static Velocity, &'static GlobalTransform)>,
}

impl RapierCollisionWorld<'_, '_> {
    fn collider(&self, id: ColliderId) -> Option<(&Collider, Transform)> {
        let entity = id.entity()?;
        let (collider, transform, ..) = self.colliders.get(entity).ok()?;
        Some((collider, transform.compute_transform()))
    }

    fn filter(mask: LayerMask) -> QueryFilter<'static> {
        QueryFilter::default().groups(CollisionGroups::new(Group::ALL, group_of(mask)))
    }
}

impl CollisionWorld for RapierCollisionWorld<'_, '_> {
    fn gravity(&self) -> Vec3 {
        self.configuration
            .iter()
            .next()
            .map_or(Vec3::new(0.0, -9.81, 0.0), |configuration| configuration.gravity)
    }

    fn sweep_sphere(
        &self,
        origin: Vec3,
        radius: f32,
        direction: Vec3,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<SweepHit> {
        let context = self.context.single().ok()?;
        let shape = Collider::ball(radius);
        let options = ShapeCastOptions {
            max_time_of_impact: max_distance,
            target_distance: 0.0,
            stop_at_penetration: false,
            compute_impact_geometry_on_penetration: false,
        };
        let (entity, hit) = context.cast_shape(
            origin,
            Quat::IDENTITY,
            direction,
            &shape,
            options,
            Self::filter(mask),
        )?;

        // Hit details come back in the collider's local frame; project instead.
        let collider = ColliderId::from_entity(entity);
        let center = origin + direction * hit.time_of_impact;
        let point = self.closest_point(collider, center)?;
        let normal = (center - point).try_normalize().unwrap_or(-direction);
        Some(SweepHit {
            point,
            normal,
            collider,
            distance: hit.time_of_impact,
        })
    }

    fn overlap_sphere(&self, center: Vec3, radius: f32, mask: LayerMask, out: &mut Vec<ColliderId>) {
        let Ok(context) = self.context.single() else {
            warn!("No Rapier context to query overlaps in");
            return;
        };
        let shape = Collider::ball(radius);
        context.intersections_with_shape(center, Quat::IDENTITY, &shape, Self::filter(mask), |entity| {
            out.push(ColliderId::from_entity(entity));
            true
        });
    }

    fn compute_penetration(
        &self,
        center: Vec3,
        radius: f32,
        collider: ColliderId,
    ) -> Option<Penetration> {
        let (shape, transform) = self.collider(collider)?;
        let projection = shape.project_point(transform.translation, transform.rotation, center, false);
        let to_surface = projection.point - center;
        let distance = to_surface.length();

        if projection.is_inside {
            let direction = to_surface.try_normalize()?;
            return Some(Penetration {
                direction,
                distance: distance + radius,
            });
        }
        if distance >= radius {
            return None;
        }
        Some(Penetration {
            direction: (-to_surface).try_normalize()?,
            distance: radius - distance,
        })
    }

    fn closest_point(&self, collider: ColliderId, point: Vec3) -> Option<Vec3> {
        let (shape, transform) = self.collider(collider)?;
        let projection = shape.project_point(transform.translation, transform.rotation, point, true);
        Some(projection.point)
    }

    fn collider_transform(&self, collider: ColliderId) -> Option<Transform> {
        self.collider(collider).map(|(_, transform)| transform)
    }

    fn point_velocity(&self, collider: ColliderId, point: Vec3) -> Vec3 {
        let Some(entity) = collider.entity() else {
            return Vec3::ZERO;
        };
        let body = match self.colliders.get(entity) {
            Ok((.., Some(parent))) if !self.bodies.contains(entity) => parent.parent(),
            _ => entity,
        };
        match self.bodies.get(body) {
            Ok((velocity, transform)) => {
                velocity.linvel + velocity.angvel.cross(point - transform.translation())
            }
            Err(_) => Vec3::ZERO,
        }
    }

    fn layers_of(&self, collider: ColliderId) -> LayerMask {
        collider
            .entity()
            .and_then(|entity| self.colliders.get(entity).ok())
            .map_or(LayerMask::ALL, |(_, _, groups, ..)| {
                groups.map_or(LayerMask::ALL, |groups| LayerMask(groups.memberships.bits()))
            })
    }

    fn owner_of(&self, collider: ColliderId) -> Option<OwnerId> {
        let entity = collider.entity()?;
        let (_, _, _, owner, parent) = self.colliders.get(entity).ok()?;
        owner.map(|owner| owner.0).or_else(|| {
            let parent = parent?.parent();
            self.colliders
                .get(parent)
                .ok()
                .and_then(|(_, _, _, owner, _)| owner.map(|owner| owner.0))
        })
    }
}

/// [`BleedingPlugin`](crate::plugin::BleedingPlugin) for hosts running Rapier.
///
/// Expects `RapierPhysicsPlugin` to be added by the host.
pub struct RapierBleedingPlugin<B> {
    pub config: BleedingConfig,
    _marker: PhantomData<fn() -> B>,
}

impl<B> RapierBleedingPlugin<B> {
    pub fn new(config: BleedingConfig) -> Self {
        Self {
            config,
            _marker: PhantomData,
        }
    }
}

impl<B: Resource + DecalBackend> Plugin for RapierBleedingPlugin<B> {
    fn build(&self, app: &mut App) {
        add_bleeding_core(app, &self.config);
        app.add_systems(
            FixedUpdate,
            (
                apply_inputs.in_set(BleedingSet::Input),
                step_simulation.in_set(BleedingSet::Simulate),
            ),
        )
        .add_systems(PostUpdate, paint_decals::<B>.in_set(BleedingRenderSet::Decals));
    }
}

fn apply_inputs(
    world: RapierCollisionWorld,
    mut inputs: BleedingInputs,
    mut simulation: ResMut<BleedingSimulation>,
    mut presets: ResMut<BleedPresets>,
) {
    inputs.apply(&world, &mut simulation, &mut presets);
}

fn step_simulation(
    world: RapierCollisionWorld,
    mut simulation: ResMut<BleedingSimulation>,
    mut presets: ResMut<BleedPresets>,
    time: Res<Time<Fixed>>,
) {
    advance(&world, &mut simulation, &mut presets, time.delta_secs());
}

fn paint_decals<B: Resource + DecalBackend>(
    world: RapierCollisionWorld,
    simulation: Res<BleedingSimulation>,
    mut aggregator: ResMut<DecalAggregator>,
    mut backend: ResMut<B>,
) {
    aggregator.aggregate(&simulation, &world, &mut *backend);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collider_id_round_trips_entity() {
        let entity = Entity::from_raw(42);
        let id = ColliderId::from_entity(entity);

        assert_eq!(id.entity(), Some(entity));
    }

    #[test]
    fn test_layer_mask_maps_to_groups() {
        let group = group_of(crate::physics::layers::BODY);

        assert_eq!(group, Group::GROUP_2);
    }
}
