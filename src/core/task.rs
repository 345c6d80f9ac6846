//! Task model, lifecycle status and the submitter-facing handle.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::core::queue::Prioritized;
use crate::core::SchedulerError;

/// Task identifier.
pub type TaskId = Uuid;

/// Default deadline for a single attempt.
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);
/// Default retry budget.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default flat delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Priority band used for dispatch ordering.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Drained last.
    Low,
    /// Default band.
    #[default]
    Medium,
    /// Drained before medium and low.
    High,
    /// Always drained first.
    Critical,
}

/// Status of a task in the scheduler lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Queued, waiting for a worker slot.
    Pending,
    /// Bound to a provider and running.
    Active,
    /// Finished successfully.
    Completed,
    /// Failed; terminal unless re-admitted by the retry policy.
    Failed,
}

impl TaskStatus {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// Status only moves forward, except `Failed -> Pending` on retry.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Active)
                | (Self::Pending | Self::Active, Self::Failed)
                | (Self::Active, Self::Completed)
                | (Self::Failed, Self::Pending)
        )
    }
}

/// An immutable unit of requested work.
///
/// Built with the `with_*` methods before submission; nothing about a task
/// changes once it is handed to a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    capability: String,
    priority: Priority,
    payload: Value,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
}

impl Task {
    /// Create a task routed to providers of the given capability kind.
    pub fn new(capability: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            capability: capability.into(),
            priority: Priority::default(),
            payload,
            timeout: DEFAULT_TASK_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Set the priority band.
    #[must_use]
    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the per-attempt deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of retries after the first attempt.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the flat delay before a retry is re-admitted.
    #[must_use]
    pub const fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Unique id.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Capability kind the task must be bound to.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Priority band.
    #[must_use]
    pub const fn priority(&self) -> Priority {
        self.priority
    }

    /// Opaque payload passed to the provider.
    #[must_use]
    pub const fn payload(&self) -> &Value {
        &self.payload
    }

    /// Per-attempt deadline.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Retry budget.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before re-admission on retry.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        self.retry_delay
    }
}

/// Terminal failure delivered to the submitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (after {attempts} attempt(s))")]
pub struct TaskFailure {
    /// Final error.
    pub error: SchedulerError,
    /// Number of attempts made, including the first.
    pub attempts: u32,
}

/// Terminal task record persisted to the key/value store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReport {
    /// Task identifier.
    pub task_id: TaskId,
    /// Owning department.
    pub department: String,
    /// Capability kind.
    pub capability: String,
    /// Terminal status.
    pub status: TaskStatus,
    /// Attempts made.
    pub attempts: u32,
    /// Provider output on success.
    pub output: Option<Value>,
    /// Final error on failure.
    pub error: Option<String>,
    /// Completion timestamp (ms since epoch).
    pub finished_at_ms: u128,
}

/// Handle returned by `submit`, resolved when the task reaches a terminal state.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    status: watch::Receiver<TaskStatus>,
    outcome: oneshot::Receiver<Result<Value, TaskFailure>>,
}

impl TaskHandle {
    /// Id of the submitted task.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Most recently observed status.
    #[must_use]
    pub fn status(&self) -> TaskStatus {
        *self.status.borrow()
    }

    /// Wait until the task reports `target` or resolves.
    ///
    /// `Failed` only counts as terminal once the task is resolved: a failure
    /// awaiting retry still matches a `Failed` target, but does not end a
    /// wait for any other status.
    pub async fn wait_for_status(&mut self, target: TaskStatus) -> TaskStatus {
        let result = self
            .status
            .wait_for(|s| *s == target || *s == TaskStatus::Completed)
            .await
            .map(|s| *s);
        // The ticket drops its sender on resolution, so a closed channel
        // holds the terminal status.
        result.unwrap_or_else(|_| *self.status.borrow())
    }

    /// Wait for the terminal outcome.
    ///
    /// # Errors
    ///
    /// Returns the final [`TaskFailure`] if the task ended `Failed`, or a
    /// `Shutdown` failure if the agency dropped the task.
    pub async fn outcome(self) -> Result<Value, TaskFailure> {
        self.outcome.await.unwrap_or(Err(TaskFailure {
            error: SchedulerError::Shutdown,
            attempts: 0,
        }))
    }
}

/// Scheduler-side bookkeeping for one admitted task.
///
/// Owned by the department queue until terminal; the handle half lives with
/// the submitter.
#[derive(Debug)]
pub(crate) struct Ticket {
    pub(crate) task: Arc<Task>,
    pub(crate) seq: u64,
    pub(crate) remaining_retries: u32,
    pub(crate) attempts: u32,
    status_tx: watch::Sender<TaskStatus>,
    outcome_tx: Option<oneshot::Sender<Result<Value, TaskFailure>>>,
}

impl Ticket {
    pub(crate) fn issue(task: Task, seq: u64) -> (Self, TaskHandle) {
        let (status_tx, status_rx) = watch::channel(TaskStatus::Pending);
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let id = task.id();
        let remaining_retries = task.max_retries();
        let ticket = Self {
            task: Arc::new(task),
            seq,
            remaining_retries,
            attempts: 0,
            status_tx,
            outcome_tx: Some(outcome_tx),
        };
        let handle = TaskHandle {
            id,
            status: status_rx,
            outcome: outcome_rx,
        };
        (ticket, handle)
    }

    pub(crate) fn status(&self) -> TaskStatus {
        *self.status_tx.borrow()
    }

    pub(crate) fn transition(&self, next: TaskStatus) {
        let current = self.status();
        debug_assert!(
            current.can_transition_to(next),
            "illegal task transition {current:?} -> {next:?}"
        );
        self.status_tx.send_replace(next);
    }

    /// Consume one retry. Returns false when the budget is spent.
    pub(crate) fn take_retry(&mut self) -> bool {
        if self.remaining_retries == 0 {
            return false;
        }
        self.remaining_retries -= 1;
        true
    }

    pub(crate) fn resolve(mut self, outcome: Result<Value, TaskFailure>) {
        if let Some(tx) = self.outcome_tx.take() {
            // Submitter may have dropped the handle.
            let _ = tx.send(outcome);
        }
    }
}

impl Prioritized for Ticket {
    fn priority(&self) -> Priority {
        self.task.priority()
    }

    fn sequence(&self) -> u64 {
        self.seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_status_transitions() {
        use TaskStatus::{Active, Completed, Failed, Pending};
        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Failed));
        assert!(Failed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Active.can_transition_to(Pending));
    }

    #[test]
    fn test_retry_budget_only_decrements() {
        let task = Task::new("search", Value::Null).with_max_retries(2);
        let (mut ticket, _handle) = Ticket::issue(task, 0);
        assert!(ticket.take_retry());
        assert!(ticket.take_retry());
        assert!(!ticket.take_retry());
        assert_eq!(ticket.remaining_retries, 0);
        assert_eq!(ticket.task.max_retries(), 2);
    }

    #[tokio::test]
    async fn test_handle_resolves() {
        let (ticket, handle) = Ticket::issue(Task::new("search", Value::Null), 0);
        ticket.transition(TaskStatus::Active);
        ticket.transition(TaskStatus::Completed);
        assert_eq!(handle.status(), TaskStatus::Completed);
        ticket.resolve(Ok(Value::from(7)));
        assert_eq!(handle.outcome().await, Ok(Value::from(7)));
    }

    #[tokio::test]
    async fn test_dropped_ticket_reports_shutdown() {
        let (ticket, handle) = Ticket::issue(Task::new("search", Value::Null), 0);
        drop(ticket);
        let failure = handle.outcome().await.unwrap_err();
        assert_eq!(failure.error, SchedulerError::Shutdown);
    }
}
