//! Error types for scheduler and provider operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by scheduler components.
///
/// Every failure that reaches the scheduler carries its classification in
/// the variant itself; [`SchedulerError::is_retryable`] is the only place the
/// retry policy looks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// Provider option missing or invalid, or provider not configured.
    #[error("configuration error in provider `{provider}`: {reason}")]
    Configuration {
        /// Provider name.
        provider: String,
        /// First offending option key, if a specific key is at fault.
        key: Option<String>,
        /// Why the configuration was rejected.
        reason: String,
    },
    /// Configure or reset attempted while execution is bound.
    #[error("concurrent mutation rejected: {0}")]
    ConcurrentMutation(String),
    /// Task exceeded its deadline.
    #[error("task timed out after {0:?}")]
    Timeout(Duration),
    /// Provider call failed in a recoverable way.
    #[error("transient execution error: {0}")]
    TransientExecution(String),
    /// Provider call failed in a non-recoverable way.
    #[error("permanent execution error: {0}")]
    PermanentExecution(String),
    /// Queue is full for the target department.
    #[error("queue full: {0}")]
    QueueFull(String),
    /// Department is saturated and its queue is full.
    #[error("resources exhausted: {0}")]
    ResourceExhausted(String),
    /// Agency or department configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// No department with that name.
    #[error("unknown department: {0}")]
    UnknownDepartment(String),
    /// Department name registered twice.
    #[error("duplicate department: {0}")]
    DuplicateDepartment(String),
    /// No provider can accept the task.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// The agency has not been started.
    #[error("agency is not running")]
    NotRunning,
    /// The agency stopped before the task reached a terminal state.
    #[error("agency shut down")]
    Shutdown,
    /// Key/value store failure with context.
    #[error("storage error: {0}")]
    Storage(String),
}

impl SchedulerError {
    /// Whether the retry policy may re-admit a task that failed with this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_) | Self::TransientExecution(_))
    }

    /// Whether this error was raised at admission time.
    #[must_use]
    pub const fn is_admission_rejection(&self) -> bool {
        matches!(self, Self::QueueFull(_) | Self::ResourceExhausted(_))
    }
}

/// Failure reported by a capability implementation.
///
/// Capabilities flag whether a failure is recoverable. Anything they cannot
/// classify goes into [`CapabilityError::Other`] and is treated as permanent.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Recoverable failure, e.g. an I/O hiccup.
    #[error("{0}")]
    Transient(String),
    /// Non-recoverable failure, e.g. invalid input.
    #[error("{0}")]
    Permanent(String),
    /// Unclassified failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CapabilityError {
    /// Classify at the provider boundary. Unclassified errors fail closed.
    #[must_use]
    pub fn classify(self) -> SchedulerError {
        match self {
            Self::Transient(msg) => SchedulerError::TransientExecution(msg),
            Self::Permanent(msg) => SchedulerError::PermanentExecution(msg),
            Self::Other(err) => SchedulerError::PermanentExecution(format!("{err:#}")),
        }
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
