use bevy::prelude::*;

/// Ordering of the bleeding systems inside `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BleedingSet {
    /// Config sync, hit handling and spawn events.
    Input,
    /// Delayed bleeds and the simulation tick.
    Simulate,
    /// Impact marks handed back to the host.
    Output,
}

/// Ordering of the bleeding systems inside `PostUpdate`.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum BleedingRenderSet {
    Decals,
}
