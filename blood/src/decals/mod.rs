//! Aggregation of surface drop trails into per-surface grids for a renderer.
//!
//! The renderer itself lives outside this crate behind [`DecalBackend`]. Once
//! per render frame the [`DecalAggregator`] collects the drops that moved in the
//! last physics tick, buckets their projection segments into one
//! [`DecalGrid`] per render surface in range, and hands each grid over as a
//! [`DecalBatch`].

pub mod aggregator;
pub mod grid;

use std::error::Error;

use bevy::math::bounding::Aabb3d;
use bevy::math::{Affine3A, UVec3};
use serde::{Deserialize, Serialize};

use crate::physics::ColliderId;

pub use aggregator::{DecalAggregator, DecalReport};
pub use grid::{CellRange, DecalGrid, SegmentRecord};

/// Handle to a paintable render surface (a mesh renderer, a skinned part).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

/// A render surface a trail may be painted onto.
#[derive(Clone, Copy, Debug)]
pub struct RenderSurface {
    pub id: SurfaceId,
    /// World-space bounds; the surface's grid covers exactly this box.
    pub bounds: Aabb3d,
    /// Whether the surface is currently on screen.
    pub visible: bool,
}

/// Everything a renderer needs to paint one surface for one frame.
#[derive(Clone, Copy, Debug)]
pub struct DecalBatch<'a> {
    pub surface: SurfaceId,
    /// Maps world positions into cell coordinates of the grid.
    pub world_to_grid: Affine3A,
    pub resolution: UVec3,
    /// Segments grouped by cell, in cell order.
    pub segments: &'a [SegmentRecord],
    /// One `(offset, count)` range into `segments` per cell, x fastest.
    pub cells: &'a [CellRange],
}

/// The painting side of the decal pipeline.
pub trait DecalBackend {
    /// Pushes every render surface that belongs to `collider` into `out`.
    fn surfaces_for(&self, collider: ColliderId, out: &mut Vec<RenderSurface>);

    /// Paints one batch. Errors are logged and the batch is skipped.
    fn submit(&mut self, batch: &DecalBatch<'_>) -> Result<(), Box<dyn Error>>;
}
