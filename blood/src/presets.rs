//! Turning hits on a creature into bleeding.
//!
//! A [`Hit`] opens a wound where it landed and, for some hits, schedules a
//! delayed nose or mouth bleed. Delayed bleeds remember their anchor in the
//! head collider's frame, so they appear in the right place however far the
//! head moved in the meantime.

use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::ops::Range;

use bevy::prelude::*;
use bevy_ecs::resource::Resource;
use bevy_log::debug;

use crate::constants::{
    LOWER_LIP_OFFSET, MOUTH_BLEED_COOLDOWN_SECONDS, MOUTH_BLEED_WIDTH, NOSE_BLEED_LOCK_SECONDS,
    NOSE_HIT_RADIUS, NOSTRIL_OFFSET, UNDER_NOSE_OFFSET, WOUND_SPACING,
};
use crate::drops::BleederKind;
use crate::physics::{ColliderId, CollisionWorld, OwnerId};
use crate::random::{inverse_lerp, DropRng};
use crate::simulation::{BleederSpawn, BleedingSimulation};

const NEAR_NOSE_DELAY: Range<f32> = 0.75..1.75;
const HARD_HEAD_HIT_DELAY: Range<f32> = 1.0..2.0;
const INTERNAL_BLEED_DELAY: Range<f32> = 2.0..4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DamageKind {
    Pierce,
    Slash,
    Blunt,
    /// Energy, fire and anything else that never draws blood.
    Other,
}

impl DamageKind {
    /// Weakest hit of this kind that has any effect.
    pub fn min_intensity(self) -> Option<f32> {
        match self {
            DamageKind::Pierce => Some(0.001),
            DamageKind::Slash => Some(0.01),
            DamageKind::Blunt => Some(0.45),
            DamageKind::Other => None,
        }
    }

    fn intensity_scale(self) -> f32 {
        match self {
            DamageKind::Pierce => 2.5,
            DamageKind::Blunt => 0.5,
            DamageKind::Slash | DamageKind::Other => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BodyRegion {
    Head,
    Neck,
    Torso,
    #[default]
    Limb,
}

/// Duration, frequency and size multipliers of a bleed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BleedMultipliers {
    pub duration: f32,
    pub frequency: f32,
    pub size: f32,
}

impl BleedMultipliers {
    pub const ONE: Self = Self::splat(1.0);

    pub const fn splat(value: f32) -> Self {
        Self {
            duration: value,
            frequency: value,
            size: value,
        }
    }

    pub const fn new(duration: f32, frequency: f32, size: f32) -> Self {
        Self {
            duration,
            frequency,
            size,
        }
    }
}

/// World poses of the parts of a head that can bleed.
#[derive(Clone, Copy, Debug)]
pub struct Face {
    /// Collider the face moves with.
    pub head: ColliderId,
    /// Centre between the eyes, looking forward along +Z.
    pub eyes: Transform,
    /// Jaw bone, if the creature has one.
    pub jaw: Option<Transform>,
}

/// A damaging contact on a creature.
#[derive(Clone, Copy, Debug)]
pub struct Hit {
    pub owner: OwnerId,
    /// Collider that was hit.
    pub collider: ColliderId,
    pub point: Vec3,
    /// Orientation of the wound; drops leave from its local XZ plane.
    pub rotation: Quat,
    pub kind: DamageKind,
    pub region: BodyRegion,
    /// Raw hit intensity, usually in `[0, 1]`.
    pub intensity: f32,
    pub face: Option<Face>,
}

/// What a hit set in motion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HitOutcome {
    pub wound: bool,
    pub nose_bleed: bool,
    pub mouth_bleed: bool,
}

/// Shape and strength of the wound a hit opens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WoundProfile {
    pub multipliers: BleedMultipliers,
    pub dimensions: Vec2,
}

/// Wound opened by a hit, `None` if the hit does not break the skin.
///
/// Only piercing and slashing hits bleed from the wound itself. Slashes
/// spread their drops along a cut that grows with intensity.
pub fn wound_profile(kind: DamageKind, region: BodyRegion, intensity: f32) -> Option<WoundProfile> {
    if !matches!(kind, DamageKind::Pierce | DamageKind::Slash) {
        return None;
    }
    let min = kind.min_intensity()?;
    if intensity < min {
        return None;
    }
    let intensity = intensity * kind.intensity_scale();

    let base = 0.6 + (1.5 - 0.6) * inverse_lerp(min, 1.0, intensity);
    let mut multipliers = BleedMultipliers::splat(base);
    match region {
        BodyRegion::Neck => {
            multipliers.duration *= 5.0;
            multipliers.frequency *= 4.0;
            multipliers.size *= 1.4;
        }
        BodyRegion::Head => {
            multipliers.duration *= 2.0;
            multipliers.frequency *= 1.7;
            multipliers.size *= 0.9;
        }
        BodyRegion::Torso => {
            multipliers.duration *= 2.0;
            multipliers.frequency *= 2.0;
        }
        BodyRegion::Limb => {}
    }

    let dimensions = match kind {
        DamageKind::Slash => Vec2::new(0.0, 0.06 + 0.06 * intensity.clamp(0.0, 1.0)),
        _ => Vec2::splat(0.01),
    };

    Some(WoundProfile {
        multipliers,
        dimensions,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DelayedKind {
    Nose,
    Mouth,
}

/// A bleed waiting for its delay to run out.
#[derive(Clone, Copy, Debug)]
struct DelayedBleed {
    kind: DelayedKind,
    owner: OwnerId,
    head: ColliderId,
    /// Eye centre or jaw pose in the head collider's frame.
    local_pose: Transform,
    remaining: f32,
    multipliers: BleedMultipliers,
}

#[derive(Clone, Copy, Debug)]
struct NoseBleedLock {
    frequency: f32,
    remaining: f32,
}

/// Hit handling plus the timers of delayed nose and mouth bleeds.
#[derive(Resource)]
pub struct BleedPresets {
    rng: DropRng,
    pending: Vec<DelayedBleed>,
    nose_locks: HashMap<OwnerId, NoseBleedLock>,
    mouth_cooldowns: HashMap<OwnerId, f32>,
}

impl Default for BleedPresets {
    fn default() -> Self {
        Self::new(None)
    }
}

impl BleedPresets {
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            rng: DropRng::new(seed),
            pending: Vec::new(),
            nose_locks: HashMap::new(),
            mouth_cooldowns: HashMap::new(),
        }
    }

    /// Delayed bleeds that have not fired yet.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// True while a nose bleed on `owner` can only be replaced by a stronger one.
    pub fn has_nose_bleed(&self, owner: OwnerId) -> bool {
        self.nose_locks.contains_key(&owner)
    }

    /// Reacts to a hit: opens a wound and schedules nose or mouth bleeds.
    pub fn on_hit<W: CollisionWorld + ?Sized>(
        &mut self,
        simulation: &mut BleedingSimulation,
        world: &W,
        hit: &Hit,
    ) -> HitOutcome {
        let mut outcome = HitOutcome::default();
        let Some(min) = hit.kind.min_intensity() else {
            return outcome;
        };
        if hit.intensity < min {
            return outcome;
        }
        let scaled = hit.intensity * hit.kind.intensity_scale();
        let config = simulation.config();

        if hit.kind == DamageKind::Blunt && hit.region == BodyRegion::Head && config.nose_bleeds_enabled {
            if let Some(face) = &hit.face {
                let nose = face.eyes.transform_point(Vec3::from(UNDER_NOSE_OFFSET));
                if nose.distance(hit.point) < NOSE_HIT_RADIUS {
                    let delay = self.rng.range(NEAR_NOSE_DELAY);
                    outcome.nose_bleed = self.schedule_nose_bleed(
                        world,
                        hit.owner,
                        face,
                        delay,
                        BleedMultipliers::new(1.0, 1.0, 0.7),
                    );
                    return outcome;
                }
                if hit.intensity > 0.5 {
                    let delay = self.rng.range(HARD_HEAD_HIT_DELAY);
                    outcome.nose_bleed = self.schedule_nose_bleed(
                        world,
                        hit.owner,
                        face,
                        delay,
                        BleedMultipliers::new(scaled, scaled, scaled.max(0.3)),
                    );
                }
            }
        }

        if config.mouth_bleeds_enabled
            && hit.kind == DamageKind::Pierce
            && hit.region == BodyRegion::Torso
            && scaled > 0.2
        {
            if let Some(face) = &hit.face {
                // Internal bleeding comes up through both nose and mouth.
                let delay = self.rng.range(INTERNAL_BLEED_DELAY);
                outcome.nose_bleed |= self.schedule_nose_bleed(
                    world,
                    hit.owner,
                    face,
                    delay,
                    BleedMultipliers::new(0.2, 0.1, 0.7),
                );
                let delay = self.rng.range(INTERNAL_BLEED_DELAY);
                outcome.mouth_bleed =
                    self.schedule_mouth_bleed(world, hit.owner, face, delay, BleedMultipliers::ONE);
            }
        }

        if !simulation.config().wounds_enabled {
            return outcome;
        }
        let Some(profile) = wound_profile(hit.kind, hit.region, hit.intensity) else {
            return outcome;
        };
        if simulation.has_bleeder_near(world, hit.point, WOUND_SPACING) {
            return outcome;
        }
        let multipliers = profile.multipliers;
        let spawn = BleederSpawn::new(hit.collider, Transform::from_translation(hit.point).with_rotation(hit.rotation))
            .with_dimensions(profile.dimensions)
            .with_multipliers(multipliers.frequency, multipliers.size, multipliers.duration)
            .with_owner(hit.owner);
        outcome.wound = simulation.spawn_bleeder(world, spawn);
        outcome
    }

    /// Queues a nose bleed on `face` after `delay` seconds.
    ///
    /// Returns false if the head collider is already gone.
    pub fn schedule_nose_bleed<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        owner: OwnerId,
        face: &Face,
        delay: f32,
        multipliers: BleedMultipliers,
    ) -> bool {
        self.schedule(world, DelayedKind::Nose, owner, face.head, face.eyes, delay, multipliers)
    }

    /// Queues a mouth bleed on `face` after `delay` seconds.
    ///
    /// Returns false if the face has no jaw or the head collider is gone.
    pub fn schedule_mouth_bleed<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        owner: OwnerId,
        face: &Face,
        delay: f32,
        multipliers: BleedMultipliers,
    ) -> bool {
        let Some(jaw) = face.jaw else {
            return false;
        };
        self.schedule(world, DelayedKind::Mouth, owner, face.head, jaw, delay, multipliers)
    }

    fn schedule<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        kind: DelayedKind,
        owner: OwnerId,
        head: ColliderId,
        pose: Transform,
        delay: f32,
        multipliers: BleedMultipliers,
    ) -> bool {
        let Some(head_transform) = world.collider_transform(head) else {
            return false;
        };
        let local_pose =
            Transform::from_matrix(head_transform.compute_matrix().inverse() * pose.compute_matrix());
        self.pending.push(DelayedBleed {
            kind,
            owner,
            head,
            local_pose,
            remaining: delay,
            multipliers,
        });
        true
    }

    /// Advances the timers and fires every delayed bleed that is due.
    ///
    /// Returns how many bleeds started.
    pub fn update<W: CollisionWorld + ?Sized>(
        &mut self,
        simulation: &mut BleedingSimulation,
        world: &W,
        dt: f32,
    ) -> usize {
        self.nose_locks.retain(|_, lock| {
            lock.remaining -= dt;
            lock.remaining > 0.0
        });
        self.mouth_cooldowns.retain(|_, remaining| {
            *remaining -= dt;
            *remaining > 0.0
        });

        let mut started = 0;
        let mut index = 0;
        while index < self.pending.len() {
            self.pending[index].remaining -= dt;
            if self.pending[index].remaining > 0.0 {
                index += 1;
                continue;
            }
            let bleed = self.pending.swap_remove(index);
            let fired = match bleed.kind {
                DelayedKind::Nose => self.start_nose_bleed(simulation, world, &bleed),
                DelayedKind::Mouth => self.start_mouth_bleed(simulation, world, &bleed),
            };
            if fired {
                started += 1;
            }
        }
        started
    }

    /// Forgets every timer of an owner that went away.
    pub fn forget_owner(&mut self, owner: OwnerId) {
        self.pending.retain(|bleed| bleed.owner != owner);
        self.nose_locks.remove(&owner);
        self.mouth_cooldowns.remove(&owner);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.nose_locks.clear();
        self.mouth_cooldowns.clear();
    }

    fn start_nose_bleed<W: CollisionWorld + ?Sized>(
        &mut self,
        simulation: &mut BleedingSimulation,
        world: &W,
        bleed: &DelayedBleed,
    ) -> bool {
        let frequency = bleed.multipliers.frequency * 2.0;
        if let Some(lock) = self.nose_locks.get(&bleed.owner) {
            if frequency <= lock.frequency {
                return false;
            }
            let owner = bleed.owner;
            let closed = simulation
                .close_bleeders(|b| b.kind == BleederKind::Nose && b.owner == Some(owner));
            debug!("Stronger nose bleed on {:?} replaced {} bleeders", owner, closed);
        }

        let Some(head) = world.collider_transform(bleed.head) else {
            return false;
        };
        let eyes = head.mul_transform(bleed.local_pose);

        let mut spawned = false;
        for side in [-NOSTRIL_OFFSET, NOSTRIL_OFFSET] {
            let mut nostril = Vec3::from(UNDER_NOSE_OFFSET);
            nostril.x = side;
            let spawn = BleederSpawn::new(
                bleed.head,
                Transform::from_translation(eyes.transform_point(nostril)).with_rotation(eyes.rotation),
            )
            .with_kind(BleederKind::Nose)
            .with_dimensions(Vec2::ZERO)
            .with_multipliers(frequency, bleed.multipliers.size, bleed.multipliers.duration * 2.0)
            .with_owner(bleed.owner);
            spawned |= simulation.insert_bleeder(world, spawn);
        }

        if spawned {
            self.nose_locks.insert(
                bleed.owner,
                NoseBleedLock {
                    frequency,
                    remaining: NOSE_BLEED_LOCK_SECONDS,
                },
            );
        }
        spawned
    }

    fn start_mouth_bleed<W: CollisionWorld + ?Sized>(
        &mut self,
        simulation: &mut BleedingSimulation,
        world: &W,
        bleed: &DelayedBleed,
    ) -> bool {
        if self.mouth_cooldowns.contains_key(&bleed.owner) {
            return false;
        }
        let Some(head) = world.collider_transform(bleed.head) else {
            return false;
        };
        let jaw = head.mul_transform(bleed.local_pose);
        // Tilts the emitter so drops run down the chin.
        let lip_rotation = Quat::from_euler(EulerRot::YXZ, (-55.0f32).to_radians(), 0.0, -FRAC_PI_2);

        let spawn = BleederSpawn::new(
            bleed.head,
            Transform::from_translation(jaw.transform_point(Vec3::from(LOWER_LIP_OFFSET)))
                .with_rotation(jaw.rotation * lip_rotation),
        )
        .with_kind(BleederKind::Mouth)
        .with_dimensions(Vec2::new(MOUTH_BLEED_WIDTH, 0.0))
        .with_multipliers(
            bleed.multipliers.frequency * 4.0,
            bleed.multipliers.size,
            bleed.multipliers.duration * 0.3,
        )
        .with_owner(bleed.owner);

        let spawned = simulation.insert_bleeder(world, spawn);
        if spawned {
            self.mouth_cooldowns
                .insert(bleed.owner, MOUTH_BLEED_COOLDOWN_SECONDS);
        }
        spawned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BleedingConfig;
    use crate::physics::analytic::{AnalyticCollider, AnalyticWorld};

    const OWNER: OwnerId = OwnerId(7);

    struct Scene {
        world: AnalyticWorld,
        head: ColliderId,
        arm: ColliderId,
        simulation: BleedingSimulation,
        presets: BleedPresets,
    }

    fn scene(config: BleedingConfig) -> Scene {
        let mut world = AnalyticWorld::default();
        let head = world.insert(AnalyticCollider::sphere(Vec3::new(0.0, 1.6, 0.0), 0.1).with_owner(OWNER));
        let arm = world.insert(AnalyticCollider::sphere(Vec3::new(0.5, 1.2, 0.0), 0.05).with_owner(OWNER));
        Scene {
            world,
            head,
            arm,
            simulation: BleedingSimulation::new(BleedingConfig {
                seed: Some(11),
                ..config
            }),
            presets: BleedPresets::new(Some(11)),
        }
    }

    fn face(head: ColliderId) -> Face {
        Face {
            head,
            eyes: Transform::from_xyz(0.0, 1.65, 0.0),
            jaw: Some(Transform::from_xyz(0.0, 1.55, 0.0)),
        }
    }

    fn hit(collider: ColliderId, point: Vec3, kind: DamageKind, region: BodyRegion, intensity: f32) -> Hit {
        Hit {
            owner: OWNER,
            collider,
            point,
            rotation: Quat::IDENTITY,
            kind,
            region,
            intensity,
            face: None,
        }
    }

    fn count(simulation: &BleedingSimulation, kind: BleederKind) -> usize {
        simulation.bleeders().iter().filter(|b| b.kind == kind).count()
    }

    #[test]
    fn test_wound_profile_by_kind_and_region() {
        assert!(wound_profile(DamageKind::Blunt, BodyRegion::Limb, 1.0).is_none());
        assert!(wound_profile(DamageKind::Other, BodyRegion::Limb, 1.0).is_none());
        assert!(wound_profile(DamageKind::Slash, BodyRegion::Limb, 0.005).is_none());

        let slash = wound_profile(DamageKind::Slash, BodyRegion::Limb, 0.5).expect("slash bleeds");
        assert_eq!(slash.dimensions.x, 0.0);
        assert!((slash.dimensions.y - 0.09).abs() < 1e-5);

        let limb = wound_profile(DamageKind::Pierce, BodyRegion::Limb, 1.0).expect("pierce bleeds");
        assert_eq!(limb.dimensions, Vec2::splat(0.01));
        assert!((limb.multipliers.frequency - 1.5).abs() < 1e-5);

        let neck = wound_profile(DamageKind::Pierce, BodyRegion::Neck, 1.0).expect("pierce bleeds");
        assert!((neck.multipliers.duration - 7.5).abs() < 1e-4);
        assert!((neck.multipliers.frequency - 6.0).abs() < 1e-4);
        assert!((neck.multipliers.size - 2.1).abs() < 1e-4);
    }

    #[test]
    fn test_hit_opens_spaced_wounds() {
        let mut s = scene(BleedingConfig::default());
        let point = Vec3::new(0.5, 1.25, 0.0);

        let first = s.presets.on_hit(
            &mut s.simulation,
            &s.world,
            &hit(s.arm, point, DamageKind::Pierce, BodyRegion::Limb, 0.3),
        );
        let second = s.presets.on_hit(
            &mut s.simulation,
            &s.world,
            &hit(s.arm, point + Vec3::new(0.02, 0.0, 0.0), DamageKind::Slash, BodyRegion::Limb, 0.3),
        );

        assert!(first.wound);
        assert!(!second.wound);
        assert_eq!(s.simulation.bleeders().len(), 1);
        assert_eq!(s.simulation.bleeders()[0].owner, Some(OWNER));
    }

    #[test]
    fn test_disabled_wounds_open_nothing() {
        let mut s = scene(BleedingConfig {
            wounds_enabled: false,
            ..Default::default()
        });

        let outcome = s.presets.on_hit(
            &mut s.simulation,
            &s.world,
            &hit(s.arm, Vec3::new(0.5, 1.25, 0.0), DamageKind::Pierce, BodyRegion::Limb, 0.3),
        );

        assert_eq!(outcome, HitOutcome::default());
        assert!(s.simulation.bleeders().is_empty());
    }

    #[test]
    fn test_punch_on_nose_bleeds_from_both_nostrils() {
        let mut s = scene(BleedingConfig::default());
        let mut punch = hit(s.head, Vec3::new(0.0, 1.6, 0.09), DamageKind::Blunt, BodyRegion::Head, 0.6);
        punch.face = Some(face(s.head));

        let outcome = s.presets.on_hit(&mut s.simulation, &s.world, &punch);
        assert!(outcome.nose_bleed);
        assert!(!outcome.wound);
        assert_eq!(s.presets.pending(), 1);
        assert!(s.simulation.bleeders().is_empty());

        let started = s.presets.update(&mut s.simulation, &s.world, 2.0);

        assert_eq!(started, 1);
        assert_eq!(count(&s.simulation, BleederKind::Nose), 2);
        assert!(s.presets.has_nose_bleed(OWNER));
        let anchors: Vec<Vec3> = s
            .simulation
            .bleeders()
            .iter()
            .filter_map(|b| b.anchor(&s.world))
            .map(|anchor| anchor.translation)
            .collect();
        assert!((anchors[0].distance(anchors[1]) - 2.0 * NOSTRIL_OFFSET).abs() < 1e-4);
        for anchor in anchors {
            assert!((anchor.y - 1.595).abs() < 1e-4);
            assert!((anchor.z - 0.046).abs() < 1e-4);
        }
    }

    #[test]
    fn test_nose_bleed_replaced_only_by_stronger() {
        let mut s = scene(BleedingConfig::default());
        let face = face(s.head);

        s.presets
            .schedule_nose_bleed(&s.world, OWNER, &face, 0.0, BleedMultipliers::ONE);
        s.presets.update(&mut s.simulation, &s.world, 0.02);
        assert_eq!(count(&s.simulation, BleederKind::Nose), 2);

        s.presets
            .schedule_nose_bleed(&s.world, OWNER, &face, 0.0, BleedMultipliers::splat(0.5));
        assert_eq!(s.presets.update(&mut s.simulation, &s.world, 0.02), 0);

        s.presets
            .schedule_nose_bleed(&s.world, OWNER, &face, 0.0, BleedMultipliers::splat(3.0));
        assert_eq!(s.presets.update(&mut s.simulation, &s.world, 0.02), 1);
        assert_eq!(count(&s.simulation, BleederKind::Nose), 2);
        assert!(s
            .simulation
            .bleeders()
            .iter()
            .all(|b| (b.frequency_multiplier - 6.0).abs() < 1e-5));
    }

    #[test]
    fn test_nose_lock_expires() {
        let mut s = scene(BleedingConfig::default());
        let face = face(s.head);
        s.presets
            .schedule_nose_bleed(&s.world, OWNER, &face, 0.0, BleedMultipliers::ONE);
        s.presets.update(&mut s.simulation, &s.world, 0.02);
        assert!(s.presets.has_nose_bleed(OWNER));

        s.presets.update(&mut s.simulation, &s.world, NOSE_BLEED_LOCK_SECONDS);

        assert!(!s.presets.has_nose_bleed(OWNER));
    }

    #[test]
    fn test_nose_bleeds_toggle() {
        let mut s = scene(BleedingConfig {
            nose_bleeds_enabled: false,
            ..Default::default()
        });
        let mut punch = hit(s.head, Vec3::new(0.0, 1.6, 0.09), DamageKind::Blunt, BodyRegion::Head, 0.9);
        punch.face = Some(face(s.head));

        let outcome = s.presets.on_hit(&mut s.simulation, &s.world, &punch);

        assert!(!outcome.nose_bleed);
        assert_eq!(s.presets.pending(), 0);
    }

    #[test]
    fn test_torso_stab_bleeds_from_mouth_once() {
        let mut s = scene(BleedingConfig::default());
        let mut stab = hit(s.arm, Vec3::new(0.5, 1.25, 0.0), DamageKind::Pierce, BodyRegion::Torso, 0.5);
        stab.face = Some(face(s.head));

        let outcome = s.presets.on_hit(&mut s.simulation, &s.world, &stab);
        assert!(outcome.wound && outcome.nose_bleed && outcome.mouth_bleed);
        stab.point.x += 0.2;
        s.presets.on_hit(&mut s.simulation, &s.world, &stab);
        assert_eq!(s.presets.pending(), 4);

        s.presets.update(&mut s.simulation, &s.world, 4.1);

        assert_eq!(s.presets.pending(), 0);
        assert_eq!(count(&s.simulation, BleederKind::Mouth), 1);
        assert_eq!(count(&s.simulation, BleederKind::Nose), 2);
        let mouth = s
            .simulation
            .bleeders()
            .iter()
            .find(|b| b.kind == BleederKind::Mouth)
            .expect("mouth bleeder");
        assert_eq!(mouth.dimensions, Vec2::new(MOUTH_BLEED_WIDTH, 0.0));
        assert!((mouth.frequency_multiplier - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_mouth_bleeds_toggle() {
        let mut s = scene(BleedingConfig {
            mouth_bleeds_enabled: false,
            ..Default::default()
        });
        let mut stab = hit(s.arm, Vec3::new(0.5, 1.25, 0.0), DamageKind::Pierce, BodyRegion::Torso, 0.5);
        stab.face = Some(face(s.head));

        let outcome = s.presets.on_hit(&mut s.simulation, &s.world, &stab);

        assert!(outcome.wound);
        assert!(!outcome.mouth_bleed);
        assert_eq!(s.presets.pending(), 0);
    }

    #[test]
    fn test_forgotten_owner_never_bleeds() {
        let mut s = scene(BleedingConfig::default());
        let face = face(s.head);
        s.presets
            .schedule_nose_bleed(&s.world, OWNER, &face, 1.0, BleedMultipliers::ONE);

        s.presets.forget_owner(OWNER);
        s.presets.update(&mut s.simulation, &s.world, 2.0);

        assert!(s.simulation.bleeders().is_empty());
    }
}
