//! A decal backend that only counts what it would paint.

use std::collections::HashMap;
use std::error::Error;

use bevy_ecs::resource::Resource;
use blood::physics::analytic::AnalyticWorld;
use blood::{ColliderId, DecalBackend, DecalBatch, RenderSurface, SurfaceId};

#[derive(Resource, Default, Debug)]
pub struct TallyBackend {
    surfaces: HashMap<ColliderId, RenderSurface>,
    pub batches: usize,
    pub segments: usize,
    pub painted: HashMap<SurfaceId, usize>,
}

impl TallyBackend {
    /// Gives `collider` one render surface covering its bounds.
    pub fn track(&mut self, world: &AnalyticWorld, collider: ColliderId) -> bool {
        let Some(bounds) = world.bounds(collider) else {
            return false;
        };
        self.surfaces.insert(
            collider,
            RenderSurface {
                id: SurfaceId(collider.0),
                bounds,
                visible: true,
            },
        );
        true
    }

    /// Refits surface bounds to where the colliders are now; forgets removed ones.
    pub fn sync(&mut self, world: &AnalyticWorld) {
        self.surfaces.retain(|collider, surface| match world.bounds(*collider) {
            Some(bounds) => {
                surface.bounds = bounds;
                true
            }
            None => false,
        });
    }

    pub fn tracked(&self) -> usize {
        self.surfaces.len()
    }
}

impl DecalBackend for TallyBackend {
    fn surfaces_for(&self, collider: ColliderId, out: &mut Vec<RenderSurface>) {
        out.extend(self.surfaces.get(&collider).copied());
    }

    fn submit(&mut self, batch: &DecalBatch<'_>) -> Result<(), Box<dyn Error>> {
        self.batches += 1;
        self.segments += batch.segments.len();
        *self.painted.entry(batch.surface).or_default() += 1;
        Ok(())
    }
}
