//! Per-tick stages of the simulation.
//!
//! Each stage works on a [`DropStore`] and a borrowed [`StepContext`]; the
//! [`crate::simulation::BleedingSimulation`] owns both and runs the stages in
//! order: emission, free fall, surface update.

pub mod bleeder;
pub mod disposal;
pub mod falling;
pub mod scheduler;
pub mod surface;

use std::collections::VecDeque;

use crate::collections::SwapBackList;
use crate::config::BleedingConfig;
use crate::drops::{Bleeder, FallingDrop, StaticMarkRequest, SurfaceDrop};
use crate::physics::{ColliderId, CollisionLayers};
use crate::random::{DropRng, SurfaceNoise};

/// Every live wound and drop of one simulation.
#[derive(Debug, Default)]
pub struct DropStore {
    pub bleeders: SwapBackList<Bleeder>,
    pub falling: SwapBackList<FallingDrop>,
    pub surface: SwapBackList<SurfaceDrop>,
    /// Environment impacts waiting for the host, oldest first.
    pub static_marks: VecDeque<StaticMarkRequest>,
}

impl DropStore {
    /// Queues an impact mark, dropping the oldest ones past `limit`.
    pub fn push_static_mark(&mut self, mark: StaticMarkRequest, limit: usize) {
        self.static_marks.push_back(mark);
        while self.static_marks.len() > limit {
            self.static_marks.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.bleeders.clear();
        self.falling.clear();
        self.surface.clear();
        self.static_marks.clear();
    }
}

/// Shared inputs and scratch space of a tick.
pub struct StepContext<'a> {
    /// Number of the tick being run, starting at one.
    pub tick: u64,
    pub config: &'a BleedingConfig,
    pub layers: CollisionLayers,
    pub rng: &'a mut DropRng,
    pub noise: &'a SurfaceNoise,
    /// Reused buffer for overlap queries.
    pub overlaps: &'a mut Vec<ColliderId>,
}

/// What happened during one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub emitted: usize,
    pub landed: usize,
    pub impacts: usize,
    pub updated: usize,
    pub dripped: usize,
    pub removed: usize,
}
