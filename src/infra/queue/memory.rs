//! In-memory queue with strict priority and FIFO tie-break.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::core::queue::{Prioritized, TaskQueue};
use crate::core::SchedulerError;

/// Wrapper ordering items by priority (highest first) and FIFO within priority.
struct Ranked<T> {
    item: T,
}

impl<T: Prioritized> PartialEq for Ranked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Prioritized> Eq for Ranked<T> {}

impl<T: Prioritized> PartialOrd for Ranked<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Prioritized> Ord for Ranked<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.item.priority().cmp(&other.item.priority()) {
            // Earlier sequence wins (reversed for max-heap)
            Ordering::Equal => other.item.sequence().cmp(&self.item.sequence()),
            ord => ord,
        }
    }
}

/// In-memory queue storing tasks in a priority heap.
/// Enqueue and dequeue are O(log n).
pub struct InMemoryQueue<T> {
    max_depth: usize,
    items: BinaryHeap<Ranked<T>>,
}

impl<T: Prioritized> InMemoryQueue<T> {
    /// Create a new in-memory queue with a maximum depth.
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self {
            max_depth,
            items: BinaryHeap::with_capacity(max_depth.min(1024)),
        }
    }
}

impl<T: Prioritized> TaskQueue<T> for InMemoryQueue<T> {
    fn enqueue(&mut self, item: T) -> Result<(), SchedulerError> {
        if self.is_full() {
            return Err(SchedulerError::QueueFull(format!(
                "max queue depth {} reached",
                self.max_depth
            )));
        }
        self.items.push(Ranked { item });
        Ok(())
    }

    fn dequeue(&mut self) -> Option<T> {
        self.items.pop().map(|r| r.item)
    }

    fn dequeue_first(&mut self, ready: &mut dyn FnMut(&T) -> bool) -> Option<T> {
        let mut skipped = Vec::new();
        let mut found = None;
        while let Some(ranked) = self.items.pop() {
            if ready(&ranked.item) {
                found = Some(ranked.item);
                break;
            }
            skipped.push(ranked);
        }
        self.items.extend(skipped);
        found
    }

    fn drain_ordered(&mut self) -> Vec<T> {
        let mut sorted = std::mem::take(&mut self.items).into_sorted_vec();
        sorted.reverse();
        sorted.into_iter().map(|r| r.item).collect()
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}
