//! API-facing request/response models.
//!
//! Plain serde types for embedding the agency behind an RPC or HTTP layer;
//! no transport is provided here.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::monitor::MetricsSnapshot;
use crate::core::{Priority, SchedulerError, TaskHandle, TaskId, TaskReport, TaskStatus};
use crate::runtime::Agency;

/// Task submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSubmission {
    /// Target department.
    pub department: String,
    /// Capability kind.
    pub capability: String,
    /// Priority band.
    #[serde(default)]
    pub priority: Priority,
    /// Opaque payload handed to the provider.
    #[serde(default)]
    pub payload: Value,
    /// Per-attempt timeout in seconds; orchestration default when absent.
    #[serde(default)]
    pub timeout_secs: Option<f64>,
    /// Retry budget; orchestration default when absent.
    #[serde(default)]
    pub max_retries: Option<u32>,
    /// Flat retry delay in seconds; orchestration default when absent.
    #[serde(default)]
    pub retry_delay_secs: Option<f64>,
}

/// Task status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Task identifier.
    pub task_id: TaskId,
    /// Current status.
    pub status: TaskStatus,
    /// Failure reason, if terminal and failed.
    pub reason: Option<String>,
}

impl From<&TaskReport> for TaskStatusResponse {
    fn from(report: &TaskReport) -> Self {
        Self {
            task_id: report.task_id,
            status: report.status,
            reason: report.error.clone(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Agency is running.
    pub ok: bool,
    /// Live snapshot per department.
    pub departments: Vec<MetricsSnapshot>,
}

fn seconds(value: f64, field: &str) -> Result<Duration, SchedulerError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| SchedulerError::InvalidConfig(format!("{field}: {e}")))
}

/// Build a task from `req` and submit it.
///
/// # Errors
///
/// [`SchedulerError::InvalidConfig`] for negative or non-finite durations,
/// otherwise any error from [`Agency::submit`].
pub fn submit_task(agency: &Agency, req: TaskSubmission) -> Result<TaskHandle, SchedulerError> {
    let mut task = agency
        .task(req.capability, req.payload)
        .with_priority(req.priority);
    if let Some(secs) = req.timeout_secs {
        task = task.with_timeout(seconds(secs, "timeout_secs")?);
    }
    if let Some(retries) = req.max_retries {
        task = task.with_max_retries(retries);
    }
    if let Some(secs) = req.retry_delay_secs {
        task = task.with_retry_delay(seconds(secs, "retry_delay_secs")?);
    }
    agency.submit(&req.department, task)
}

/// Report on the agency's health.
#[must_use]
pub fn health(agency: &Agency) -> Health {
    Health {
        ok: agency.is_running(),
        departments: agency.snapshot().into_values().collect(),
    }
}

/// Status of a task that has reached a terminal state.
///
/// # Errors
///
/// [`SchedulerError::UnknownDepartment`] or a storage error.
pub fn task_status(
    agency: &Agency,
    department: &str,
    id: TaskId,
) -> Result<Option<TaskStatusResponse>, SchedulerError> {
    Ok(agency
        .task_report(department, id)?
        .as_ref()
        .map(TaskStatusResponse::from))
}
