use rand::{Rng, RngCore};

use super::{
    INITIAL_PRIORITY, PrioritizedEntry, ReplayMemory, SampledBatch, Transition, sanitize_priority,
};

/// Binary sum tree over a power-of-two number of leaves
///
/// Node `1` is the root and node `i` has children `2i` and `2i + 1`. Leaves
/// start at `leaf_count`. Parents are recomputed from their children on every
/// write, so the root never drifts from the sum of the leaves.
#[derive(Debug, Clone)]
struct SumTree {
    nodes: Vec<f64>,
    leaf_count: usize,
}

impl SumTree {
    fn new(slots: usize) -> Self {
        let leaf_count = slots.max(1).next_power_of_two();
        Self {
            nodes: vec![0.0; 2 * leaf_count],
            leaf_count,
        }
    }

    fn total(&self) -> f64 {
        self.nodes[1]
    }

    fn set(&mut self, slot: usize, priority: f64) {
        let mut node = self.leaf_count + slot;
        self.nodes[node] = priority;
        while node > 1 {
            node /= 2;
            self.nodes[node] = self.nodes[2 * node] + self.nodes[2 * node + 1];
        }
    }

    /// Slot whose cumulative priority range contains `mass`
    ///
    /// Only called with `total() > 0`; the descent never enters a zero subtree.
    fn find(&self, mut mass: f64) -> usize {
        let mut node = 1;
        while node < self.leaf_count {
            let left = 2 * node;
            let right = left + 1;
            if mass < self.nodes[left] || self.nodes[right] <= 0.0 {
                node = left;
            } else {
                mass -= self.nodes[left];
                node = right;
            }
        }
        node - self.leaf_count
    }
}

/// Replay memory with O(log n) priority-proportional draws
///
/// Entries live in fixed ring slots. Logical index `0` is the oldest slot,
/// which is slot `0` until the ring first wraps and the write cursor after.
#[derive(Debug, Clone)]
pub struct SumTreeReplay {
    slots: Vec<PrioritizedEntry>,
    tree: SumTree,
    capacity: usize,
    /// Next slot to write
    cursor: usize,
}

impl SumTreeReplay {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            tree: SumTree::new(capacity),
            capacity,
            cursor: 0,
        }
    }

    fn oldest_slot(&self) -> usize {
        if self.slots.len() < self.capacity { 0 } else { self.cursor }
    }

    fn slot_of(&self, index: usize) -> Option<usize> {
        (index < self.slots.len()).then(|| (self.oldest_slot() + index) % self.capacity)
    }

    fn index_of(&self, slot: usize) -> usize {
        (slot + self.capacity - self.oldest_slot()) % self.capacity
    }
}

impl ReplayMemory for SumTreeReplay {
    fn add(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }

        let entry = PrioritizedEntry {
            transition,
            priority: INITIAL_PRIORITY,
        };
        if self.slots.len() < self.capacity {
            self.slots.push(entry);
        } else {
            self.slots[self.cursor] = entry;
        }
        self.tree.set(self.cursor, f64::from(INITIAL_PRIORITY));
        self.cursor = (self.cursor + 1) % self.capacity;
    }

    fn sample(&self, batch_size: usize, rng: &mut dyn RngCore) -> Option<SampledBatch> {
        if batch_size == 0 || self.slots.len() < batch_size {
            return None;
        }

        let total = self.tree.total();
        let mut indices = Vec::with_capacity(batch_size);
        let mut transitions = Vec::with_capacity(batch_size);

        for _ in 0..batch_size {
            let slot = if total > 0.0 {
                self.tree.find(rng.gen_range(0.0..total))
            } else {
                rng.gen_range(0..self.slots.len())
            };
            indices.push(self.index_of(slot));
            transitions.push(self.slots[slot].transition);
        }

        Some(SampledBatch {
            transitions,
            indices,
        })
    }

    fn update_priorities(&mut self, indices: &[usize], priorities: &[f32]) {
        for (&index, &priority) in indices.iter().zip(priorities) {
            let (Some(slot), Some(priority)) = (self.slot_of(index), sanitize_priority(priority))
            else {
                continue;
            };
            self.slots[slot].priority = priority;
            self.tree.set(slot, f64::from(priority));
        }
    }

    fn get(&self, index: usize) -> Option<PrioritizedEntry> {
        self.slot_of(index).map(|slot| self.slots[slot])
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
