//! Bounded 3-D bucket grid of trail segments for one render surface.

use bevy::math::bounding::Aabb3d;
use bevy::math::{Affine3A, UVec3, Vec3, Vec3A};

use crate::constants::{GRID_MAX_RESOLUTION, GRID_TARGET_CELL_SIZE, MAX_SEGMENTS_PER_CELL};

/// Smallest extent an axis is given, so flat bounds still map to cells.
const MIN_EXTENT: f32 = 1e-4;

/// One trail segment as the renderer reads it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct SegmentRecord {
    pub start: [f32; 3],
    /// `1 / radius²` of the mark painted along the segment.
    pub inv_sq_radius: f32,
    pub end: [f32; 3],
    /// Padding for GPU alignment (std140 layout)
    pub _padding: f32,
}

impl SegmentRecord {
    pub fn new(start: Vec3, end: Vec3, inv_sq_radius: f32) -> Self {
        Self {
            start: start.to_array(),
            inv_sq_radius,
            end: end.to_array(),
            _padding: 0.0,
        }
    }
}

/// Slice of the segment buffer belonging to one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct CellRange {
    pub offset: u32,
    pub count: u32,
}

/// Per-surface grid. Cleared and reused across frames.
#[derive(Clone, Debug)]
pub struct DecalGrid {
    bounds: Aabb3d,
    resolution: UVec3,
    cell_size: Vec3,
    segments: Vec<SegmentRecord>,
    cells: Vec<Vec<u32>>,
    overflowed: usize,
}

impl Default for DecalGrid {
    fn default() -> Self {
        Self::new(Aabb3d::new(Vec3::ZERO, Vec3::splat(0.5)))
    }
}

/// Cells per axis for a surface of the given extent.
pub fn grid_resolution(extent: Vec3) -> UVec3 {
    let cells = |length: f32| {
        ((length / GRID_TARGET_CELL_SIZE).ceil() as u32).clamp(1, GRID_MAX_RESOLUTION)
    };
    UVec3::new(cells(extent.x), cells(extent.y), cells(extent.z))
}

impl DecalGrid {
    pub fn new(bounds: Aabb3d) -> Self {
        let mut grid = Self {
            bounds,
            resolution: UVec3::ONE,
            cell_size: Vec3::ONE,
            segments: Vec::new(),
            cells: Vec::new(),
            overflowed: 0,
        };
        grid.reset(bounds);
        grid
    }

    /// Empties the grid and fits it to `bounds`, keeping allocations.
    pub fn reset(&mut self, bounds: Aabb3d) {
        let extent = Vec3::from(bounds.max - bounds.min).max(Vec3::splat(MIN_EXTENT));
        self.bounds = bounds;
        self.resolution = grid_resolution(extent);
        self.cell_size = extent / self.resolution.as_vec3();

        let cell_count = self.cell_count();
        for cell in &mut self.cells {
            cell.clear();
        }
        self.cells.resize_with(cell_count, Vec::new);
        self.segments.clear();
        self.overflowed = 0;
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.segments.clear();
        self.overflowed = 0;
    }

    pub fn bounds(&self) -> Aabb3d {
        self.bounds
    }

    pub fn resolution(&self) -> UVec3 {
        self.resolution
    }

    pub fn cell_count(&self) -> usize {
        (self.resolution.x * self.resolution.y * self.resolution.z) as usize
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Insertions rejected because every target cell was full.
    pub fn overflowed(&self) -> usize {
        self.overflowed
    }

    /// Maps world space onto cell coordinates: bounds min to zero, max to the resolution.
    pub fn world_to_grid(&self) -> Affine3A {
        let scale = self.cell_size.recip();
        Affine3A::from_scale(scale) * Affine3A::from_translation(-Vec3::from(self.bounds.min))
    }

    /// Linear index of the cell containing `point`, clamped into the grid.
    pub fn cell_index(&self, point: Vec3) -> usize {
        let local = (Vec3A::from(point) - self.bounds.min) / Vec3A::from(self.cell_size);
        let max = self.resolution.as_vec3a() - Vec3A::ONE;
        let cell = local.floor().clamp(Vec3A::ZERO, max).as_uvec3();
        (cell.x + self.resolution.x * (cell.y + self.resolution.y * cell.z)) as usize
    }

    /// Buckets a segment into the cell of its midpoint and, when they differ,
    /// the cells of its endpoints.
    ///
    /// Full cells are skipped. Returns false if no cell took the segment.
    pub fn insert(&mut self, start: Vec3, end: Vec3, inv_sq_radius: f32) -> bool {
        let mut targets = [usize::MAX; 3];
        let mut target_count = 0;
        for point in [(start + end) * 0.5, start, end] {
            let cell = self.cell_index(point);
            if targets[..target_count].contains(&cell) {
                continue;
            }
            if self.cells[cell].len() < MAX_SEGMENTS_PER_CELL {
                targets[target_count] = cell;
                target_count += 1;
            }
        }

        if target_count == 0 {
            self.overflowed += 1;
            return false;
        }

        let index = self.segments.len() as u32;
        self.segments
            .push(SegmentRecord::new(start, end, inv_sq_radius));
        for &cell in &targets[..target_count] {
            self.cells[cell].push(index);
        }
        true
    }

    /// Flattens the grid into a segment buffer grouped by cell and a cell
    /// index buffer of `(offset, count)` pairs.
    ///
    /// Both buffers are cleared first. The output only depends on what was
    /// inserted, so writing twice yields identical buffers.
    pub fn write_buffers(&self, segments: &mut Vec<SegmentRecord>, cells: &mut Vec<CellRange>) {
        segments.clear();
        cells.clear();
        cells.reserve(self.cells.len());

        for cell in &self.cells {
            let offset = segments.len() as u32;
            segments.extend(cell.iter().map(|&index| self.segments[index as usize]));
            cells.push(CellRange {
                offset,
                count: cell.len() as u32,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid() -> DecalGrid {
        DecalGrid::new(Aabb3d::new(Vec3::ZERO, Vec3::splat(1.0)))
    }

    #[test]
    fn test_resolution_is_clamped() {
        assert_eq!(grid_resolution(Vec3::new(2.0, 0.05, 0.0)), UVec3::new(20, 3, 1));

        let grid = unit_grid();
        assert_eq!(grid.resolution(), UVec3::splat(20));
        assert_eq!(grid.cell_count(), 8000);
    }

    #[test]
    fn test_cell_index_clamps_outside_points() {
        let grid = unit_grid();

        assert_eq!(grid.cell_index(Vec3::splat(-1.0)), 0);
        assert_eq!(grid.cell_index(Vec3::splat(5.0)), grid.cell_count() - 1);
        assert_eq!(grid.cell_index(Vec3::new(-0.95, -1.0, -1.0)), 0);
        assert_eq!(grid.cell_index(Vec3::new(-0.85, -1.0, -1.0)), 1);
    }

    #[test]
    fn test_segment_spans_endpoint_cells() {
        let mut grid = unit_grid();

        assert!(grid.insert(Vec3::new(-0.55, 0.15, 0.05), Vec3::new(-0.55, -0.15, 0.05), 1.0));

        let mut segments = Vec::new();
        let mut cells = Vec::new();
        grid.write_buffers(&mut segments, &mut cells);
        assert_eq!(grid.segment_count(), 1);
        assert_eq!(cells.len(), grid.cell_count());
        let referenced: u32 = cells.iter().map(|cell| cell.count).sum();
        assert_eq!(referenced as usize, segments.len());
        assert_eq!(referenced, 3);
    }

    #[test]
    fn test_full_cells_drop_segments() {
        let mut grid = unit_grid();
        let point = Vec3::new(0.3, 0.3, 0.3);

        for _ in 0..MAX_SEGMENTS_PER_CELL {
            assert!(grid.insert(point, point, 1.0));
        }
        assert!(!grid.insert(point, point, 1.0));

        assert_eq!(grid.segment_count(), MAX_SEGMENTS_PER_CELL);
        assert_eq!(grid.overflowed(), 1);
    }

    #[test]
    fn test_serialization_is_repeatable() {
        let mut grid = unit_grid();
        for (i, point) in [Vec3::ZERO, Vec3::ONE, -Vec3::ONE, Vec3::Z, Vec3::ONE, Vec3::ZERO]
            .into_iter()
            .enumerate()
        {
            grid.insert(point, point + Vec3::X * 0.1, i as f32);
        }

        let (mut segments_a, mut cells_a) = (Vec::new(), Vec::new());
        let (mut segments_b, mut cells_b) = (Vec::new(), Vec::new());
        grid.write_buffers(&mut segments_a, &mut cells_a);
        grid.write_buffers(&mut segments_b, &mut cells_b);

        assert_eq!(segments_a, segments_b);
        assert_eq!(cells_a, cells_b);
    }

    #[test]
    fn test_world_to_grid_maps_bounds() {
        let grid = DecalGrid::new(Aabb3d::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.1, 0.2, 0.3)));
        let transform = grid.world_to_grid();

        let low = transform.transform_point3(Vec3::new(0.9, -0.2, -0.3));
        let high = transform.transform_point3(Vec3::new(1.1, 0.2, 0.3));

        assert!(low.length() < 1e-4);
        assert!((high - grid.resolution().as_vec3()).length() < 1e-3);
    }

    #[test]
    fn test_reset_reuses_cells() {
        let mut grid = unit_grid();
        grid.insert(Vec3::ZERO, Vec3::ZERO, 1.0);

        grid.reset(Aabb3d::new(Vec3::ZERO, Vec3::splat(0.01)));

        assert!(grid.is_empty());
        assert_eq!(grid.resolution(), UVec3::ONE);
        assert_eq!(grid.cell_count(), 1);
    }
}
