//! Blood drop simulation for wounded creatures.
//!
//! Wounds ([`drops::Bleeder`]) emit drops that either fall under gravity or
//! stick to nearby bodies and run down them. Drops on bodies leave trails
//! that [`decals`] buckets into per-surface grids for a renderer. Collision
//! and rendering stay with the host behind [`physics::CollisionWorld`] and
//! [`decals::DecalBackend`].

pub mod collections;
pub mod config;
pub mod constants;
pub mod decals;
pub mod drops;
pub mod physics;
pub mod plugin;
pub mod presets;
pub mod random;
pub mod sets;
pub mod simulation;
pub mod systems;

pub use config::{BleedingConfig, SchedulerMode};
pub use constants::*;
pub use decals::{DecalAggregator, DecalBackend, DecalBatch, RenderSurface, SurfaceId};
pub use drops::{Bleeder, BleederKind, FallingDrop, StaticMarkRequest, SurfaceDrop};
pub use physics::{ColliderId, CollisionLayers, CollisionWorld, LayerMask, OwnerId};
pub use plugin::{
    BleedingHit, BleedingPlugin, OwnerDespawned, SpawnBleeder, SpawnFallingDrop, StaticMark,
};
pub use presets::{BleedPresets, BodyRegion, DamageKind, Face, Hit};
pub use simulation::{BleederSpawn, BleedingSimulation, BleedingStats};
