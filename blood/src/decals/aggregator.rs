use std::collections::HashMap;

use bevy::math::bounding::Aabb3d;
use bevy::math::{Vec3, Vec3A};
use bevy_ecs::resource::Resource;
use bevy_log::{debug, warn};

use super::grid::{CellRange, DecalGrid, SegmentRecord};
use super::{DecalBackend, DecalBatch, RenderSurface, SurfaceId};
use crate::constants::PROJECTION_DEPTH;
use crate::physics::CollisionWorld;
use crate::simulation::BleedingSimulation;

/// Outcome of one aggregation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecalReport {
    /// Drops whose trail was bucketed into at least one grid.
    pub drops: usize,
    pub batches: usize,
    pub segments: usize,
    /// Segments lost to full cells.
    pub overflowed: usize,
    /// Batches the backend refused.
    pub failed: usize,
}

/// Owns the grid pool and the flat buffers handed to the renderer.
///
/// Grids live in slots that are recycled through a free list, so a steady
/// state allocates nothing per frame.
#[derive(Resource, Default)]
pub struct DecalAggregator {
    slots: Vec<DecalGrid>,
    free: Vec<usize>,
    active: HashMap<SurfaceId, usize>,
    /// Active surfaces in first-touched order, for a stable submission order.
    order: Vec<SurfaceId>,
    surfaces: Vec<RenderSurface>,
    segment_buffer: Vec<SegmentRecord>,
    cell_buffer: Vec<CellRange>,
    last_tick: Option<u64>,
}

/// Distance from `point` to the closest point of `bounds`, zero inside.
pub fn distance_to_bounds(bounds: &Aabb3d, point: Vec3) -> f32 {
    let point = Vec3A::from(point);
    point.distance(point.clamp(bounds.min, bounds.max))
}

impl DecalAggregator {
    /// Grids allocated so far, in use or pooled.
    pub fn pooled_grids(&self) -> usize {
        self.slots.len()
    }

    /// Tick whose drops were painted last.
    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    /// Paints the trails of every drop that moved since the last paint.
    ///
    /// All ticks run since the previous call are covered, so several physics
    /// ticks per render frame lose no trail. Frames rendered before the next
    /// physics tick return an empty report.
    pub fn aggregate<W, B>(
        &mut self,
        simulation: &BleedingSimulation,
        world: &W,
        backend: &mut B,
    ) -> DecalReport
    where
        W: CollisionWorld + ?Sized,
        B: DecalBackend + ?Sized,
    {
        let mut report = DecalReport::default();
        let tick = simulation.tick();
        if self.last_tick == Some(tick) {
            return report;
        }
        let painted_up_to = self.last_tick.unwrap_or(0);
        self.last_tick = Some(tick);

        let config = simulation.config();
        for drop in simulation.surface_drops() {
            if !drop.moved_since(painted_up_to) {
                continue;
            }
            let Some(position) = drop.contact.world_position(world) else {
                continue;
            };

            let offset = drop.contact.normal * PROJECTION_DEPTH;
            let radius = drop.size * config.size_multiplier;
            if radius <= 0.0 {
                continue;
            }
            let inv_sq_radius = (radius * radius).recip();

            self.surfaces.clear();
            backend.surfaces_for(drop.collider(), &mut self.surfaces);

            let mut painted = false;
            for surface in &self.surfaces {
                if !config.update_decals_when_far_away && !surface.visible {
                    continue;
                }
                if distance_to_bounds(&surface.bounds, position) > config.decal_surface_distance {
                    continue;
                }
                let slot = Self::acquire(
                    &mut self.slots,
                    &mut self.free,
                    &mut self.active,
                    &mut self.order,
                    surface,
                );
                painted |= self.slots[slot].insert(position + offset, position - offset, inv_sq_radius);
            }
            if painted {
                report.drops += 1;
            }
        }

        for surface in &self.order {
            let Some(&slot) = self.active.get(surface) else {
                continue;
            };
            let grid = &self.slots[slot];
            report.overflowed += grid.overflowed();
            if grid.is_empty() {
                continue;
            }

            grid.write_buffers(&mut self.segment_buffer, &mut self.cell_buffer);
            let batch = DecalBatch {
                surface: *surface,
                world_to_grid: grid.world_to_grid(),
                resolution: grid.resolution(),
                segments: &self.segment_buffer,
                cells: &self.cell_buffer,
            };
            match backend.submit(&batch) {
                Ok(()) => {
                    report.batches += 1;
                    report.segments += grid.segment_count();
                }
                Err(error) => {
                    warn!("Decal submission for {:?} failed: {}", surface, error);
                    report.failed += 1;
                }
            }
        }

        self.release_all();

        if report.overflowed > 0 {
            debug!("{} trail segments dropped by full grid cells", report.overflowed);
        }
        report
    }

    /// Slot of the grid for `surface`, fitting a pooled or new grid on first use.
    fn acquire(
        slots: &mut Vec<DecalGrid>,
        free: &mut Vec<usize>,
        active: &mut HashMap<SurfaceId, usize>,
        order: &mut Vec<SurfaceId>,
        surface: &RenderSurface,
    ) -> usize {
        if let Some(&slot) = active.get(&surface.id) {
            return slot;
        }

        let slot = match free.pop() {
            Some(slot) => {
                slots[slot].reset(surface.bounds);
                slot
            }
            None => {
                slots.push(DecalGrid::new(surface.bounds));
                slots.len() - 1
            }
        };
        active.insert(surface.id, slot);
        order.push(surface.id);
        slot
    }

    fn release_all(&mut self) {
        for (_, slot) in self.active.drain() {
            self.slots[slot].clear();
            self.free.push(slot);
        }
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use bevy::prelude::*;

    use super::*;
    use crate::config::{BleedingConfig, SchedulerMode};
    use crate::physics::analytic::{AnalyticCollider, AnalyticWorld};
    use crate::physics::ColliderId;

    #[derive(Default)]
    struct RecordingBackend {
        surfaces: Vec<(ColliderId, RenderSurface)>,
        batches: Vec<(SurfaceId, Vec<SegmentRecord>, Vec<CellRange>)>,
        fail: bool,
    }

    impl DecalBackend for RecordingBackend {
        fn surfaces_for(&self, collider: ColliderId, out: &mut Vec<RenderSurface>) {
            out.extend(
                self.surfaces
                    .iter()
                    .filter(|(owner, _)| *owner == collider)
                    .map(|(_, surface)| *surface),
            );
        }

        fn submit(&mut self, batch: &DecalBatch<'_>) -> Result<(), Box<dyn Error>> {
            if self.fail {
                return Err("backend offline".into());
            }
            self.batches
                .push((batch.surface, batch.segments.to_vec(), batch.cells.to_vec()));
            Ok(())
        }
    }

    fn scene() -> (AnalyticWorld, ColliderId, BleedingSimulation) {
        let mut world = AnalyticWorld::default();
        let body = world.insert(AnalyticCollider::cuboid(Vec3::ZERO, Vec3::splat(0.5)));
        let mut simulation = BleedingSimulation::new(BleedingConfig {
            seed: Some(3),
            scheduler: SchedulerMode::RoundRobin,
            ..Default::default()
        });
        simulation.spawn_falling_drop(Vec3::new(0.0, 0.6, 0.0), Vec3::ZERO, 0.01);
        // Land it, then let it settle for a tick.
        for _ in 0..20 {
            simulation.step(&world, 0.02);
        }
        assert_eq!(simulation.surface_drops().len(), 1);
        (world, body, simulation)
    }

    fn surface(id: u64, center: Vec3) -> RenderSurface {
        RenderSurface {
            id: SurfaceId(id),
            bounds: Aabb3d::new(center, Vec3::splat(0.5)),
            visible: true,
        }
    }

    #[test]
    fn test_paints_surfaces_in_range_once_per_tick() {
        let (world, body, simulation) = scene();
        let mut backend = RecordingBackend::default();
        backend.surfaces.push((body, surface(1, Vec3::ZERO)));
        backend.surfaces.push((body, surface(2, Vec3::new(5.0, 0.0, 0.0))));
        let mut aggregator = DecalAggregator::default();

        let report = aggregator.aggregate(&simulation, &world, &mut backend);

        assert_eq!(report.drops, 1);
        assert_eq!(report.batches, 1);
        assert_eq!(backend.batches.len(), 1);
        assert_eq!(backend.batches[0].0, SurfaceId(1));
        assert!(!backend.batches[0].1.is_empty());

        let again = aggregator.aggregate(&simulation, &world, &mut backend);
        assert_eq!(again, DecalReport::default());
        assert_eq!(backend.batches.len(), 1);
    }

    #[test]
    fn test_grids_are_pooled() {
        let (world, body, mut simulation) = scene();
        let mut backend = RecordingBackend::default();
        backend.surfaces.push((body, surface(1, Vec3::ZERO)));
        let mut aggregator = DecalAggregator::default();

        for _ in 0..5 {
            simulation.step(&world, 0.02);
            aggregator.aggregate(&simulation, &world, &mut backend);
        }

        assert_eq!(aggregator.pooled_grids(), 1);
        assert_eq!(aggregator.last_tick(), Some(simulation.tick()));
    }

    #[test]
    fn test_trails_from_every_tick_since_last_paint() {
        let mut world = AnalyticWorld::default();
        let body = world.insert(AnalyticCollider::cuboid(Vec3::ZERO, Vec3::splat(0.5)));
        let mut simulation = BleedingSimulation::new(BleedingConfig {
            seed: Some(3),
            scheduler: SchedulerMode::RoundRobin,
            max_surface_updates_per_tick: 1,
            ..Default::default()
        });
        for x in [-0.2, 0.2] {
            simulation.spawn_falling_drop(Vec3::new(x, 0.6, 0.0), Vec3::ZERO, 0.01);
        }
        for _ in 0..20 {
            simulation.step(&world, 0.02);
        }
        assert_eq!(simulation.surface_drops().len(), 2);

        let mut backend = RecordingBackend::default();
        backend.surfaces.push((body, surface(1, Vec3::ZERO)));
        let mut aggregator = DecalAggregator::default();
        aggregator.aggregate(&simulation, &world, &mut backend);

        // Two ticks in one frame: each drop moves in only one of them.
        simulation.step(&world, 0.02);
        simulation.step(&world, 0.02);
        let report = aggregator.aggregate(&simulation, &world, &mut backend);

        assert_eq!(report.drops, 2);
        assert_eq!(aggregator.last_tick(), Some(simulation.tick()));
    }

    #[test]
    fn test_backend_failure_is_reported_not_fatal() {
        let (world, body, simulation) = scene();
        let mut backend = RecordingBackend {
            fail: true,
            ..Default::default()
        };
        backend.surfaces.push((body, surface(1, Vec3::ZERO)));
        let mut aggregator = DecalAggregator::default();

        let report = aggregator.aggregate(&simulation, &world, &mut backend);

        assert_eq!(report.failed, 1);
        assert_eq!(report.batches, 0);
        assert_eq!(aggregator.pooled_grids(), 1);
    }

    #[test]
    fn test_hidden_surfaces_skipped_when_far_updates_disabled() {
        let (world, body, mut simulation) = scene();
        let mut config = simulation.config().clone();
        config.update_decals_when_far_away = false;
        simulation.set_config(config);
        simulation.step(&world, 0.02);

        let mut backend = RecordingBackend::default();
        let mut hidden = surface(1, Vec3::ZERO);
        hidden.visible = false;
        backend.surfaces.push((body, hidden));
        let mut aggregator = DecalAggregator::default();

        let report = aggregator.aggregate(&simulation, &world, &mut backend);

        assert_eq!(report.batches, 0);
        assert_eq!(report.drops, 0);
    }

    #[test]
    fn test_distance_to_bounds() {
        let bounds = Aabb3d::new(Vec3::ZERO, Vec3::splat(1.0));

        assert_eq!(distance_to_bounds(&bounds, Vec3::ZERO), 0.0);
        assert!((distance_to_bounds(&bounds, Vec3::new(3.0, 0.0, 0.0)) - 2.0).abs() < 1e-6);
    }
}
