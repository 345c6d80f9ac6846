//! Bounded per-operation state log.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::clock::now_ms;

/// Default number of operation ids a provider remembers.
pub const DEFAULT_STATE_CAPACITY: usize = 128;

/// Status of one recorded operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Capability call in progress.
    Active,
    /// Capability call succeeded.
    Completed,
    /// Capability call failed or timed out.
    Failed,
}

/// `{timestamp, payload, status}` snapshot of one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    /// Timestamp milliseconds of the last update.
    pub timestamp_ms: u128,
    /// Payload the operation was invoked with.
    pub payload: Value,
    /// Current status.
    pub status: OperationStatus,
}

/// Ring buffer of operation records keyed by operation id.
///
/// Writing an existing id overwrites it in place and keeps its position.
/// Writing a new id when full evicts the oldest id first.
#[derive(Debug, Clone)]
pub struct StateLog {
    capacity: usize,
    records: HashMap<String, StateRecord>,
    order: VecDeque<String>,
}

impl StateLog {
    /// Empty log holding at most `capacity` ids (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    /// Insert or overwrite the record for `operation`.
    pub fn record(&mut self, operation: &str, payload: Value, status: OperationStatus) {
        let record = StateRecord {
            timestamp_ms: now_ms(),
            payload,
            status,
        };
        if let Some(existing) = self.records.get_mut(operation) {
            *existing = record;
            return;
        }
        if self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.records.remove(&oldest);
            }
        }
        self.order.push_back(operation.to_owned());
        self.records.insert(operation.to_owned(), record);
    }

    /// Update only the status of an existing record.
    pub fn mark(&mut self, operation: &str, status: OperationStatus) {
        if let Some(existing) = self.records.get_mut(operation) {
            existing.status = status;
            existing.timestamp_ms = now_ms();
        }
    }

    /// Record for `operation`, if still retained.
    #[must_use]
    pub fn get(&self, operation: &str) -> Option<&StateRecord> {
        self.records.get(operation)
    }

    /// Records oldest first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StateRecord)> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).map(|r| (id.as_str(), r)))
    }

    /// Number of retained ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether nothing is retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of retained ids.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// `(finished, failed)` counts over retained records.
    #[must_use]
    pub fn outcome_counts(&self) -> (usize, usize) {
        self.records
            .values()
            .fold((0, 0), |(done, failed), r| match r.status {
                OperationStatus::Active => (done, failed),
                OperationStatus::Completed => (done + 1, failed),
                OperationStatus::Failed => (done + 1, failed + 1),
            })
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }
}

impl Default for StateLog {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_CAPACITY)
    }
}
