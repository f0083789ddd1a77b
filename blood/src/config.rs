//! Runtime configuration of the bleeding simulation.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::{DECAL_SURFACE_DISTANCE, DEFAULT_MAX_STATIC_MARKS, DEFAULT_MAX_SURFACE_UPDATES};

/// How surface drops are picked for a full step when there are more of them
/// than the per-tick budget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Reflect)]
pub enum SchedulerMode {
    /// A slow cursor sweeps the population and a small window around it
    /// updates every tick, so drops take turns moving at full rate.
    #[default]
    Wavefront,
    /// A single cursor hands the budget to consecutive drops, spreading it
    /// evenly over the whole population.
    RoundRobin,
}

/// Runtime knobs, read by every system each tick.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize, Reflect)]
#[reflect(Resource)]
#[serde(default)]
pub struct BleedingConfig {
    /// Wounds spawn bleeders. Turning this off also clears active bleeders.
    pub wounds_enabled: bool,
    pub nose_bleeds_enabled: bool,
    pub mouth_bleeds_enabled: bool,

    /// Surface drops that receive a full physics step per tick.
    pub max_surface_updates_per_tick: usize,
    pub scheduler: SchedulerMode,

    /// Scales emission frequency of every bleeder.
    pub amount_multiplier: f32,
    /// Scales how long bleeders keep emitting.
    pub duration_multiplier: f32,
    /// Scales the width of painted trails.
    pub size_multiplier: f32,
    /// Scales surface drag; lower values let drops run faster.
    pub friction_multiplier: f32,

    /// Paint trails on every renderer in range, not only the drop's own body.
    pub update_decals_when_far_away: bool,
    /// Distance from a drop to a renderer's bounds for the renderer to get the trail.
    pub decal_surface_distance: f32,
    /// Environment marks kept until the host drains them; the oldest go first.
    pub max_static_marks: usize,

    /// Fixed seed for reproducible runs; entropy-seeded when unset.
    pub seed: Option<u64>,
}

impl Default for BleedingConfig {
    fn default() -> Self {
        Self {
            wounds_enabled: true,
            nose_bleeds_enabled: true,
            mouth_bleeds_enabled: true,
            max_surface_updates_per_tick: DEFAULT_MAX_SURFACE_UPDATES,
            scheduler: SchedulerMode::default(),
            amount_multiplier: 1.0,
            duration_multiplier: 1.0,
            size_multiplier: 1.0,
            friction_multiplier: 1.0,
            update_decals_when_far_away: true,
            decal_surface_distance: DECAL_SURFACE_DISTANCE,
            max_static_marks: DEFAULT_MAX_STATIC_MARKS,
            seed: None,
        }
    }
}

impl BleedingConfig {
    /// Emission frequency factor, never zero so intervals stay finite.
    pub fn emission_rate(&self) -> f32 {
        self.amount_multiplier.max(f32::EPSILON)
    }
}
