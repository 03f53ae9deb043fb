//! Prioritized experience replay
//!
//! Two interchangeable implementations share the [`ReplayMemory`] contract:
//!
//! - [`PrioritizedReplay`]: ring `VecDeque` with weighted-index sampling,
//!   O(n) per batch
//! - [`SumTreeReplay`]: ring slots indexed by a sum tree, O(log n) per draw
//!
//! Which one the agent uses is decided once at startup by [`build_replay`].
//!
//! Indices handed out by `sample` are logical positions with `0` the oldest
//! stored transition. They stay valid until the next insert evicts an entry.

mod prioritized;
mod sum_tree;

pub use prioritized::PrioritizedReplay;
pub use sum_tree::SumTreeReplay;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::features::Features;
use crate::game::Direction;

/// Priority given to every newly inserted transition
pub const INITIAL_PRIORITY: f32 = 1.0;

/// One step of experience
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: Features,
    pub action: Direction,
    pub reward: f32,
    pub next_state: Features,
    /// Episode ended on this step, no bootstrapping from `next_state`
    pub terminal: bool,
}

/// A stored transition with its sampling priority
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrioritizedEntry {
    pub transition: Transition,
    /// Always finite and non-negative
    pub priority: f32,
}

/// Transitions drawn by [`ReplayMemory::sample`], with the logical indices
/// they were drawn from (same order, duplicates possible)
#[derive(Debug, Clone)]
pub struct SampledBatch {
    pub transitions: Vec<Transition>,
    pub indices: Vec<usize>,
}

impl SampledBatch {
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }
}

/// Available replay implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplayKind {
    /// Weighted sampling over a ring buffer
    #[default]
    Standard,
    /// Sum-tree backed sampling
    SumTree,
}

impl ReplayKind {
    pub const ALL: [ReplayKind; 2] = [ReplayKind::Standard, ReplayKind::SumTree];
}

/// Fixed-capacity prioritized replay memory
pub trait ReplayMemory: Send {
    /// Insert with [`INITIAL_PRIORITY`], evicting the oldest entry when full
    fn add(&mut self, transition: Transition);

    /// Draw `batch_size` entries with replacement, `P(i) ∝ priority(i)`
    ///
    /// Returns `None` when `batch_size` is zero or exceeds the stored count.
    /// Falls back to uniform sampling if every priority is zero.
    fn sample(&self, batch_size: usize, rng: &mut dyn RngCore) -> Option<SampledBatch>;

    /// Overwrite priorities at logical indices
    ///
    /// Out-of-range indices and non-finite priorities are ignored, negative
    /// priorities are clamped to zero.
    fn update_priorities(&mut self, indices: &[usize], priorities: &[f32]);

    /// Entry at a logical index
    fn get(&self, index: usize) -> Option<PrioritizedEntry>;

    fn len(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Priority at a logical index
    fn priority(&self, index: usize) -> Option<f32> {
        self.get(index).map(|entry| entry.priority)
    }
}

/// Build the replay memory for the selected implementation
pub fn build_replay(kind: ReplayKind, capacity: usize) -> Box<dyn ReplayMemory> {
    match kind {
        ReplayKind::Standard => Box::new(PrioritizedReplay::new(capacity)),
        ReplayKind::SumTree => Box::new(SumTreeReplay::new(capacity)),
    }
}

/// Clamp a priority written back by the trainer, `None` when it must be ignored
pub(crate) fn sanitize_priority(priority: f32) -> Option<f32> {
    priority.is_finite().then(|| priority.max(0.0))
}
