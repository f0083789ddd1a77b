//! Removal of wounds and drops tied to an owner that went away.

use super::DropStore;
use crate::physics::OwnerId;

/// How many entries an owner disposal removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Disposed {
    pub bleeders: usize,
    pub surface_drops: usize,
}

impl Disposed {
    pub fn total(&self) -> usize {
        self.bleeders + self.surface_drops
    }
}

/// Swap-removes every bleeder and surface drop owned by `owner`.
///
/// Falling drops carry no owner and are left alone.
pub fn dispose_owner(store: &mut DropStore, owner: OwnerId) -> Disposed {
    Disposed {
        bleeders: store
            .bleeders
            .retain_swap(|bleeder| bleeder.owner != Some(owner)),
        surface_drops: store
            .surface
            .retain_swap(|drop| drop.owner != Some(owner)),
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::drops::{Bleeder, BleederKind, FallingDrop, SurfaceContact, SurfaceDrop};
    use crate::physics::ColliderId;

    fn bleeder(owner: Option<OwnerId>) -> Bleeder {
        Bleeder {
            kind: BleederKind::Wound,
            collider: ColliderId(1),
            local_anchor: Transform::IDENTITY,
            dimensions: Vec2::ZERO,
            frequency_multiplier: 1.0,
            size_multiplier: 1.0,
            next_emission: 1.0,
            lifetime: 5.0,
            owner,
        }
    }

    fn surface_drop(owner: Option<OwnerId>) -> SurfaceDrop {
        SurfaceDrop::new(SurfaceContact::new(ColliderId(1), Vec3::ZERO, 0.0), Vec3::ZERO, 0.01, 5.0)
            .with_owner(owner)
    }

    #[test]
    fn test_only_entries_of_owner_are_removed() {
        let x = OwnerId(1);
        let y = OwnerId(2);
        let mut store = DropStore::default();
        store.bleeders.push(bleeder(Some(x)));
        store.bleeders.push(bleeder(Some(y)));
        store.surface.push(surface_drop(Some(x)));
        store.surface.push(surface_drop(None));
        store.surface.push(surface_drop(Some(x)));

        let disposed = dispose_owner(&mut store, x);

        assert_eq!(disposed, Disposed { bleeders: 1, surface_drops: 2 });
        assert_eq!(disposed.total(), 3);
        assert_eq!(store.bleeders.len(), 1);
        assert_eq!(store.bleeders[0].owner, Some(y));
        assert_eq!(store.surface.len(), 1);
        assert_eq!(store.surface[0].owner, None);
    }

    #[test]
    fn test_falling_drops_survive_disposal() {
        let mut store = DropStore::default();
        store
            .falling
            .push(FallingDrop::new(Vec3::ZERO, Vec3::ZERO, 0.01, 5.0));

        let disposed = dispose_owner(&mut store, OwnerId(1));

        assert_eq!(disposed.total(), 0);
        assert_eq!(store.falling.len(), 1);
    }
}
