//! Picks which surface drops get a full physics step this tick.
//!
//! The budget bounds the per-tick cost no matter how many drops exist.

use crate::config::SchedulerMode;
use crate::constants::{WAVEFRONT_CYCLE_SECONDS, WAVEFRONT_WINDOW};

#[derive(Clone, Debug, Default)]
pub struct UpdateScheduler {
    mode: SchedulerMode,
    /// Round-robin position.
    cursor: usize,
    /// Start of the wavefront window.
    outer_start: usize,
    /// Fractional indices the outer cursor still owes.
    outer_progress: f32,
    /// Offset inside the wavefront window.
    inner: usize,
}

impl UpdateScheduler {
    pub fn new(mode: SchedulerMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> SchedulerMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: SchedulerMode) {
        if self.mode != mode {
            *self = Self::new(mode);
        }
    }

    /// Pushes the indices due this tick into `due`, at most `budget` of them.
    ///
    /// `due` is cleared first. Indices are distinct and below `population`.
    pub fn select(&mut self, population: usize, budget: usize, dt: f32, due: &mut Vec<usize>) {
        due.clear();
        if population == 0 || budget == 0 {
            return;
        }

        match self.mode {
            SchedulerMode::RoundRobin => self.select_round_robin(population, budget, due),
            SchedulerMode::Wavefront => self.select_wavefront(population, budget, dt, due),
        }
    }

    fn select_round_robin(&mut self, population: usize, budget: usize, due: &mut Vec<usize>) {
        self.cursor %= population;
        let count = budget.min(population);
        due.extend((0..count).map(|k| (self.cursor + k) % population));
        self.cursor = (self.cursor + count) % population;
    }

    fn select_wavefront(&mut self, population: usize, budget: usize, dt: f32, due: &mut Vec<usize>) {
        // The outer cursor crosses the whole population once per cycle, but
        // never jumps further than one window can cover in a tick.
        let max_step = budget.min(WAVEFRONT_WINDOW);
        self.outer_progress += population as f32 * dt / WAVEFRONT_CYCLE_SECONDS;
        let step = self.outer_progress.floor();
        self.outer_progress -= step;
        let step = (step as usize).min(max_step);
        self.outer_start = (self.outer_start + step) % population;

        let window = WAVEFRONT_WINDOW.min(population);
        self.inner %= window;
        let count = budget.min(window);
        for k in 0..count {
            let offset = (self.inner + k) % window;
            due.push((self.outer_start + offset) % population);
        }
        self.inner = (self.inner + count) % window;
    }
}
