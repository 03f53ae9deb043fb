use std::collections::VecDeque;

use rand::{
    Rng, RngCore,
    distributions::{Distribution, WeightedIndex},
};

use super::{
    INITIAL_PRIORITY, PrioritizedEntry, ReplayMemory, SampledBatch, Transition, sanitize_priority,
};

/// Ring-buffer replay memory with priority-proportional sampling
///
/// Every `sample` call rebuilds a [`WeightedIndex`] over the stored
/// priorities, so a batch costs O(n) in the number of stored entries.
///
/// # Example
///
/// ```rust
/// use worm_dqn::game::Direction;
/// use worm_dqn::rl::replay::{PrioritizedReplay, ReplayMemory, Transition};
///
/// let mut memory = PrioritizedReplay::new(2);
/// let transition = Transition {
///     state: [0.0; 11],
///     action: Direction::Up,
///     reward: 1.0,
///     next_state: [0.0; 11],
///     terminal: true,
/// };
///
/// memory.add(transition);
/// memory.add(transition);
/// memory.add(transition);
/// assert_eq!(memory.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct PrioritizedReplay {
    entries: VecDeque<PrioritizedEntry>,
    capacity: usize,
}

impl PrioritizedReplay {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }
}

impl ReplayMemory for PrioritizedReplay {
    fn add(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(PrioritizedEntry {
            transition,
            priority: INITIAL_PRIORITY,
        });
    }

    fn sample(&self, batch_size: usize, rng: &mut dyn RngCore) -> Option<SampledBatch> {
        if batch_size == 0 || self.entries.len() < batch_size {
            return None;
        }

        let indices: Vec<usize> =
            match WeightedIndex::new(self.entries.iter().map(|entry| entry.priority)) {
                Ok(weights) => (0..batch_size).map(|_| weights.sample(&mut *rng)).collect(),
                // Every weight is zero
                Err(_) => (0..batch_size)
                    .map(|_| rng.gen_range(0..self.entries.len()))
                    .collect(),
            };

        let transitions = indices
            .iter()
            .map(|&index| self.entries[index].transition)
            .collect();

        Some(SampledBatch {
            transitions,
            indices,
        })
    }

    fn update_priorities(&mut self, indices: &[usize], priorities: &[f32]) {
        for (&index, &priority) in indices.iter().zip(priorities) {
            let Some(priority) = sanitize_priority(priority) else {
                continue;
            };
            if let Some(entry) = self.entries.get_mut(index) {
                entry.priority = priority;
            }
        }
    }

    fn get(&self, index: usize) -> Option<PrioritizedEntry> {
        self.entries.get(index).copied()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
