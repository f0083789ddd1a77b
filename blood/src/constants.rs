//! Compile-time tuning for the bleeding simulation.
//!
//! Runtime knobs (multipliers, budgets, toggles) live in [`crate::config::BleedingConfig`];
//! everything here is fixed per build.

use std::ops::Range;

/// Fixed physics rate the sandbox and the plugin default to.
pub const TICKS_PER_SECOND: f64 = 50.0;

// ============================================================================
// Emission
// ============================================================================

/// Seconds between two emissions of a bleeder, before multipliers.
pub const EMISSION_INTERVAL_RANGE: Range<f32> = 1.0..2.0;

/// Seconds a bleeder keeps emitting, before multipliers.
pub const BLEEDER_LIFETIME_RANGE: Range<f32> = 3.0..8.0;

/// Radius of the sphere launch velocities are sampled from (m/s).
pub const LAUNCH_SPEED: f32 = 0.75;

/// Size of a drop emitted with a size multiplier of 1 (m).
pub const BASE_DROP_SIZE: f32 = 0.01;

/// Bleeder size multipliers are clamped into this range.
pub const SIZE_MULTIPLIER_MIN: f32 = 0.1;
pub const SIZE_MULTIPLIER_MAX: f32 = 4.0;

/// Two bleeders closer than this are considered the same wound.
pub const MIN_BLEEDER_SPACING: f32 = 0.01;

/// Emitted drops snap to the nearest adherable collider within this radius.
pub const ATTACH_RADIUS: f32 = 0.3;

// ============================================================================
// Drops
// ============================================================================

/// Seconds a drop lives, falling or on a surface.
pub const DROP_LIFETIME_RANGE: Range<f32> = 5.0..8.0;

/// Radius of the sphere used for sweeps and depenetration (m).
pub const COLLISION_RADIUS: f32 = 0.003;

/// Penetrations shallower than this are ignored.
pub const PENETRATION_EPSILON: f32 = 0.001;

/// Below this squared distance a closest-point query is refined with a penetration query.
pub const CONTACT_DISTANCE_SQ: f32 = 0.0001;

/// Seconds a drop must hang still before it drips.
pub const DRIP_TIME_RANGE: Range<f32> = 0.75..1.25;

/// Surface speed (m/s) under which a hanging drop counts as still.
pub const DRIP_SPEED_THRESHOLD: f32 = 0.1;

/// Linear drag applied to drops sliding on a surface (1/s).
pub const SURFACE_DRAG: f32 = 45.0;

/// Initial noise phase of a new surface drop is drawn from this range.
pub const NOISE_PHASE_RANGE: Range<f32> = -100.0..100.0;

/// Distance travelled is scaled by this before sampling noise.
pub const NOISE_SCALE: f32 = 20.0;

/// Largest wobble rotation per axis, in degrees.
pub const NOISE_MAX_ANGLE_DEGREES: f32 = 6.0;

/// Speed (m/s) at which the wobble reaches full strength.
pub const NOISE_FULL_SPEED: f32 = 0.1;

// ============================================================================
// Scheduling
// ============================================================================

/// Default number of surface drops stepped per tick.
pub const DEFAULT_MAX_SURFACE_UPDATES: usize = 20;

/// Seconds the wavefront cursor takes to sweep the whole population.
pub const WAVEFRONT_CYCLE_SECONDS: f32 = 12.0;

/// Width of the round-robin window around the wavefront cursor.
pub const WAVEFRONT_WINDOW: usize = 12;

// ============================================================================
// Decals
// ============================================================================

/// Upper bound on cells per grid axis.
pub const GRID_MAX_RESOLUTION: u32 = 20;

/// Preferred edge length of a grid cell (m).
pub const GRID_TARGET_CELL_SIZE: f32 = 0.02;

/// Segments a single cell can reference; extra insertions are dropped.
pub const MAX_SEGMENTS_PER_CELL: usize = 16;

/// Half length of the projection segment along the surface normal (m).
pub const PROJECTION_DEPTH: f32 = 0.05;

/// Default distance from a drop to a renderer's bounds for the renderer to receive it (m).
pub const DECAL_SURFACE_DISTANCE: f32 = 0.1;

/// Default number of undrained environment marks kept; older ones are dropped.
pub const DEFAULT_MAX_STATIC_MARKS: usize = 256;

// ============================================================================
// Presets
// ============================================================================

/// A hit closer than this to an existing wound does not open a new one (m).
pub const WOUND_SPACING: f32 = 0.05;

/// Point under the nose, in the eye-centre frame (m).
pub const UNDER_NOSE_OFFSET: [f32; 3] = [0.0, -0.055, 0.046];

/// Sideways offset of each nostril from the nose centre line (m).
pub const NOSTRIL_OFFSET: f32 = 0.008;

/// A blunt head hit this close to the nose bleeds from the nose (m).
pub const NOSE_HIT_RADIUS: f32 = 0.1;

/// Seconds during which a new nose bleed must be stronger to replace the running one.
pub const NOSE_BLEED_LOCK_SECONDS: f32 = 4.0;

/// Middle of the lower lip, in the jaw frame (m).
pub const LOWER_LIP_OFFSET: [f32; 3] = [-0.12, 0.0, 0.045];

/// Width of the lip line a mouth bleed spreads over (m).
pub const MOUTH_BLEED_WIDTH: f32 = 0.05;

/// Seconds before the same mouth can bleed again.
pub const MOUTH_BLEED_COOLDOWN_SECONDS: f32 = 4.5;
