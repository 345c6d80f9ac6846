//! Department resource accounting: utilization, rolling success ratio,
//! threshold alerts and the published snapshot the control plane reads.

use std::collections::VecDeque;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::core::department::DepartmentPolicy;
use crate::core::events::{Alert, AlertKind};
use crate::util::clock::now_ms;

/// Point-in-time view of one department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Department name.
    pub department: String,
    /// `in_flight / max_concurrent_tasks`.
    pub utilization: f64,
    /// Successes over terminal outcomes in the window; 1.0 when empty.
    pub success_ratio: f64,
    /// Tasks holding a worker slot.
    pub in_flight: usize,
    /// Tasks waiting in the queue.
    pub queued: usize,
    /// Concurrency cap the utilization was computed against.
    pub max_concurrent_tasks: usize,
    /// Outcomes currently in the window.
    pub window_len: usize,
    /// Window capacity (`performance_window`).
    pub window_capacity: usize,
    /// Timestamp milliseconds.
    pub timestamp_ms: u128,
}

impl MetricsSnapshot {
    /// Whether the rolling window has reached its capacity.
    #[must_use]
    pub const fn window_full(&self) -> bool {
        self.window_len >= self.window_capacity
    }
}

#[derive(Debug)]
struct OutcomeWindow {
    outcomes: VecDeque<bool>,
    capacity: usize,
}

impl OutcomeWindow {
    fn push(&mut self, success: bool) {
        while self.outcomes.len() >= self.capacity {
            self.outcomes.pop_front();
        }
        self.outcomes.push_back(success);
    }

    #[allow(clippy::cast_precision_loss)]
    fn success_ratio(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 1.0;
        }
        let ok = self.outcomes.iter().filter(|s| **s).count();
        ok as f64 / self.outcomes.len() as f64
    }
}

/// Rolling outcome window plus the last published snapshot.
///
/// Only the completion path records outcomes; readers of
/// [`ResourceMonitor::published`] may lag by one metrics interval.
#[derive(Debug)]
pub struct ResourceMonitor {
    department: String,
    window: Mutex<OutcomeWindow>,
    published: RwLock<Option<MetricsSnapshot>>,
}

impl ResourceMonitor {
    /// Monitor keeping the last `performance_window` outcomes.
    pub fn new(department: impl Into<String>, performance_window: usize) -> Self {
        let capacity = performance_window.max(1);
        Self {
            department: department.into(),
            window: Mutex::new(OutcomeWindow {
                outcomes: VecDeque::with_capacity(capacity),
                capacity,
            }),
            published: RwLock::new(None),
        }
    }

    /// Record one terminal outcome.
    pub fn record_outcome(&self, success: bool) {
        self.window.lock().push(success);
    }

    /// Change the window size, dropping the oldest outcomes if it shrinks.
    pub fn resize(&self, performance_window: usize) {
        let mut window = self.window.lock();
        window.capacity = performance_window.max(1);
        while window.outcomes.len() > window.capacity {
            window.outcomes.pop_front();
        }
    }

    /// Current success ratio.
    #[must_use]
    pub fn success_ratio(&self) -> f64 {
        self.window.lock().success_ratio()
    }

    /// Compute a fresh snapshot from live counters.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn observe(&self, in_flight: usize, queued: usize, policy: &DepartmentPolicy) -> MetricsSnapshot {
        let (success_ratio, window_len, window_capacity) = {
            let window = self.window.lock();
            (window.success_ratio(), window.outcomes.len(), window.capacity)
        };
        MetricsSnapshot {
            department: self.department.clone(),
            utilization: in_flight as f64 / policy.max_concurrent_tasks.max(1) as f64,
            success_ratio,
            in_flight,
            queued,
            max_concurrent_tasks: policy.max_concurrent_tasks,
            window_len,
            window_capacity,
            timestamp_ms: now_ms(),
        }
    }

    /// Alerts a snapshot triggers under `policy`.
    #[must_use]
    pub fn alerts(&self, snapshot: &MetricsSnapshot, policy: &DepartmentPolicy) -> Vec<Alert> {
        let mut alerts = Vec::new();
        if snapshot.utilization >= policy.alert_threshold {
            alerts.push(Alert::new(
                &self.department,
                AlertKind::HighUtilization {
                    utilization: snapshot.utilization,
                    threshold: policy.alert_threshold,
                },
            ));
        }
        if snapshot.success_ratio < policy.evaluation_threshold {
            alerts.push(Alert::new(
                &self.department,
                AlertKind::LowSuccessRatio {
                    success_ratio: snapshot.success_ratio,
                    threshold: policy.evaluation_threshold,
                },
            ));
        }
        alerts
    }

    /// Make `snapshot` the one admission and governance read.
    pub fn publish(&self, snapshot: MetricsSnapshot) {
        *self.published.write() = Some(snapshot);
    }

    /// Last published snapshot.
    #[must_use]
    pub fn published(&self) -> Option<MetricsSnapshot> {
        self.published.read().clone()
    }

    /// Utilization of the last published snapshot, 0.0 before the first tick.
    #[must_use]
    pub fn published_utilization(&self) -> f64 {
        self.published.read().as_ref().map_or(0.0, |s| s.utilization)
    }
}
