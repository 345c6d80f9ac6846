//! Core scheduling abstractions: tasks, providers, departments and governance.

pub mod department;
pub mod error;
pub mod events;
pub mod governance;
pub mod monitor;
pub mod provider;
pub mod queue;
pub mod store;
pub mod task;

pub use department::{Department, DepartmentPolicy};
pub use error::{AppResult, CapabilityError, SchedulerError};
pub use events::{
    Alert, AlertKind, AlertSeverity, AlertSink, FailureRecord, InMemoryAlertSink,
    InMemoryLogSink, InMemoryMetricsSink, LogEvent, LogLevel, LogSink, MetricsSink, Sinks,
    TracingAlertSink, TracingLogSink, TracingMetricsSink,
};
pub use governance::{Governance, GovernanceState, ReviewPolicy, ThresholdReview};
pub use monitor::{MetricsSnapshot, ResourceMonitor};
pub use provider::{
    Capability, ExecutionHint, FnCapability, OperationStatus, OptionSchema, Provider,
    ProviderLease, ProviderMode, ProviderOptions, StateLog, StateRecord,
};
pub use queue::{Prioritized, TaskQueue};
pub use store::KeyValueStore;
pub use task::{
    Priority, Task, TaskFailure, TaskHandle, TaskId, TaskReport, TaskStatus,
    DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY, DEFAULT_TASK_TIMEOUT,
};
