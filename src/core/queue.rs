//! Queue abstraction used by department schedulers.

use crate::core::{Priority, SchedulerError};

/// Items that can be ordered by a priority queue.
///
/// Ordering is strict priority, then ascending `sequence` (FIFO) inside a
/// band. Lower bands can starve while higher bands stay busy.
pub trait Prioritized {
    /// Priority band.
    fn priority(&self) -> Priority;
    /// Admission sequence number; lower was admitted earlier.
    fn sequence(&self) -> u64;
}

/// Abstraction for queue backends.
pub trait TaskQueue<T: Prioritized> {
    /// Enqueue an item if space permits.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::QueueFull`] at `max_depth`, leaving the queue untouched.
    fn enqueue(&mut self, item: T) -> Result<(), SchedulerError>;
    /// Remove the highest-priority item.
    fn dequeue(&mut self) -> Option<T>;
    /// Remove the highest-priority item accepted by `ready`, keeping the rest in order.
    fn dequeue_first(&mut self, ready: &mut dyn FnMut(&T) -> bool) -> Option<T>;
    /// Remove every item in dispatch order.
    fn drain_ordered(&mut self) -> Vec<T>;
    /// Maximum depth allowed for this queue.
    fn max_depth(&self) -> usize;
    /// Current depth.
    fn len(&self) -> usize;

    /// Whether the queue holds no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether another enqueue would be rejected.
    fn is_full(&self) -> bool {
        self.len() >= self.max_depth()
    }
}
