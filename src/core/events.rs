//! Collaborator sinks for structured log events, metrics and alerts.
//!
//! The core never owns logging or telemetry; it hands events to these sinks
//! fire-and-forget. Tracing-backed sinks are the default, bounded in-memory
//! sinks exist for tests and embedding.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::monitor::MetricsSnapshot;
use crate::core::TaskId;
use crate::util::clock::now_ms;

/// Severity of a structured log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Verbose diagnostics.
    Debug,
    /// Normal operation.
    Info,
    /// Something needs attention.
    Warn,
    /// A failure.
    Error,
}

/// Structured `{level, component, message, context}` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Severity.
    pub level: LogLevel,
    /// Emitting component, e.g. `provider:search` or `department:engineering`.
    pub component: String,
    /// Human readable message.
    pub message: String,
    /// Extra structured fields.
    pub context: Map<String, Value>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl LogEvent {
    /// Build an event with empty context.
    pub fn new(level: LogLevel, component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            component: component.into(),
            message: message.into(),
            context: Map::new(),
            created_at_ms: now_ms(),
        }
    }

    /// Attach a context field.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_owned(), value.into());
        self
    }
}

/// Logging collaborator.
pub trait LogSink: Send + Sync {
    /// Record a structured event.
    fn log(&self, event: LogEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, event: LogEvent) {
        let context = Value::Object(event.context);
        match event.level {
            LogLevel::Debug => {
                tracing::debug!(component = %event.component, %context, "{}", event.message);
            }
            LogLevel::Info => {
                tracing::info!(component = %event.component, %context, "{}", event.message);
            }
            LogLevel::Warn => {
                tracing::warn!(component = %event.component, %context, "{}", event.message);
            }
            LogLevel::Error => {
                tracing::error!(component = %event.component, %context, "{}", event.message);
            }
        }
    }
}

/// Terminal task failure reported to the metrics sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    /// Owning department.
    pub department: String,
    /// Failed task.
    pub task_id: TaskId,
    /// Capability kind.
    pub capability: String,
    /// Final error, rendered.
    pub error: String,
    /// Attempts made.
    pub attempts: u32,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

/// Metrics collaborator.
pub trait MetricsSink: Send + Sync {
    /// Record a periodic department snapshot.
    fn record_snapshot(&self, snapshot: &MetricsSnapshot);
    /// Record a terminal task failure.
    fn record_failure(&self, failure: &FailureRecord);
}

/// Emits metrics as `tracing` events on the `agency::metrics` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
    fn record_snapshot(&self, snapshot: &MetricsSnapshot) {
        tracing::debug!(
            target: "agency::metrics",
            department = %snapshot.department,
            utilization = snapshot.utilization,
            success_ratio = snapshot.success_ratio,
            in_flight = snapshot.in_flight,
            queued = snapshot.queued,
            "department snapshot"
        );
    }

    fn record_failure(&self, failure: &FailureRecord) {
        tracing::warn!(
            target: "agency::metrics",
            department = %failure.department,
            task_id = %failure.task_id,
            attempts = failure.attempts,
            error = %failure.error,
            "task failed"
        );
    }
}

/// Alert severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Needs attention.
    Warning,
    /// Department is at or beyond capacity, or failing most work.
    Critical,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "WARNING"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Why an alert fired.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertKind {
    /// Utilization reached the alert threshold.
    HighUtilization {
        /// Observed utilization.
        utilization: f64,
        /// Configured `alert_threshold`.
        threshold: f64,
    },
    /// Success ratio fell below the evaluation threshold.
    LowSuccessRatio {
        /// Observed success ratio.
        success_ratio: f64,
        /// Configured `evaluation_threshold`.
        threshold: f64,
    },
}

/// Structured alert raised by a department's resource manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Department that raised the alert.
    pub department: String,
    /// Trigger.
    pub kind: AlertKind,
    /// Severity.
    pub severity: AlertSeverity,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl Alert {
    /// Build an alert, deriving severity from the trigger.
    pub fn new(department: impl Into<String>, kind: AlertKind) -> Self {
        let severity = match kind {
            AlertKind::HighUtilization { utilization, .. } if utilization >= 1.0 => {
                AlertSeverity::Critical
            }
            AlertKind::LowSuccessRatio { success_ratio, .. } if success_ratio < 0.5 => {
                AlertSeverity::Critical
            }
            _ => AlertSeverity::Warning,
        };
        Self {
            department: department.into(),
            kind,
            severity,
            created_at_ms: now_ms(),
        }
    }
}

/// Alert collaborator.
pub trait AlertSink: Send + Sync {
    /// Deliver an alert.
    fn raise(&self, alert: &Alert);
}

/// Writes alerts to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn raise(&self, alert: &Alert) {
        tracing::warn!(
            target: "agency::alerts",
            department = %alert.department,
            severity = %alert.severity,
            kind = ?alert.kind,
            "department alert"
        );
    }
}

/// Bounded in-memory buffer shared by the in-memory sinks.
#[derive(Debug)]
struct Ring<T> {
    items: Mutex<VecDeque<T>>,
    max_items: usize,
}

impl<T: Clone> Ring<T> {
    fn new(max_items: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(max_items.min(1024))),
            max_items,
        }
    }

    fn push(&self, item: T) {
        let mut items = self.items.lock();
        if items.len() >= self.max_items {
            items.pop_front();
        }
        items.push_back(item);
    }

    fn snapshot(&self) -> Vec<T> {
        self.items.lock().iter().cloned().collect()
    }

    fn clear(&self) {
        self.items.lock().clear();
    }
}

/// In-memory log sink for testing and dev.
#[derive(Debug)]
pub struct InMemoryLogSink {
    events: Ring<LogEvent>,
}

impl InMemoryLogSink {
    /// Create a sink keeping at most `max_events` events.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Ring::new(max_events),
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.snapshot()
    }
}

impl LogSink for InMemoryLogSink {
    fn log(&self, event: LogEvent) {
        self.events.push(event);
    }
}

/// In-memory metrics sink for testing and dev.
#[derive(Debug)]
pub struct InMemoryMetricsSink {
    snapshots: Ring<MetricsSnapshot>,
    failures: Ring<FailureRecord>,
}

impl InMemoryMetricsSink {
    /// Create a sink keeping at most `max_records` of each record type.
    #[must_use]
    pub fn new(max_records: usize) -> Self {
        Self {
            snapshots: Ring::new(max_records),
            failures: Ring::new(max_records),
        }
    }

    /// Recorded snapshots, oldest first.
    #[must_use]
    pub fn snapshots(&self) -> Vec<MetricsSnapshot> {
        self.snapshots.snapshot()
    }

    /// Recorded failures, oldest first.
    #[must_use]
    pub fn failures(&self) -> Vec<FailureRecord> {
        self.failures.snapshot()
    }
}

impl MetricsSink for InMemoryMetricsSink {
    fn record_snapshot(&self, snapshot: &MetricsSnapshot) {
        self.snapshots.push(snapshot.clone());
    }

    fn record_failure(&self, failure: &FailureRecord) {
        self.failures.push(failure.clone());
    }
}

/// In-memory alert sink for testing and dev.
#[derive(Debug)]
pub struct InMemoryAlertSink {
    alerts: Ring<Alert>,
}

impl InMemoryAlertSink {
    /// Create a sink keeping at most `max_alerts` alerts.
    #[must_use]
    pub fn new(max_alerts: usize) -> Self {
        Self {
            alerts: Ring::new(max_alerts),
        }
    }

    /// Recorded alerts, oldest first.
    #[must_use]
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.snapshot()
    }

    /// Forget recorded alerts.
    pub fn clear(&self) {
        self.alerts.clear();
    }
}

impl AlertSink for InMemoryAlertSink {
    fn raise(&self, alert: &Alert) {
        self.alerts.push(alert.clone());
    }
}

/// The set of collaborators a department reports to.
#[derive(Clone)]
pub struct Sinks {
    /// Structured logging.
    pub log: Arc<dyn LogSink>,
    /// Snapshots and terminal failures.
    pub metrics: Arc<dyn MetricsSink>,
    /// Threshold alerts.
    pub alerts: Arc<dyn AlertSink>,
}

impl Default for Sinks {
    fn default() -> Self {
        Self {
            log: Arc::new(TracingLogSink),
            metrics: Arc::new(TracingMetricsSink),
            alerts: Arc::new(TracingAlertSink),
        }
    }
}

impl fmt::Debug for Sinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sinks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_sink_overflow() {
        let sink = InMemoryLogSink::new(2);
        sink.log(LogEvent::new(LogLevel::Info, "a", "one"));
        sink.log(LogEvent::new(LogLevel::Info, "a", "two"));
        sink.log(LogEvent::new(LogLevel::Warn, "a", "three"));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].message, "two");
        assert_eq!(events[1].level, LogLevel::Warn);
    }

    #[test]
    fn test_log_event_context() {
        let event = LogEvent::new(LogLevel::Debug, "provider:search", "configured")
            .with("keys", 2)
            .with("mode", "active");
        assert_eq!(event.context["keys"], Value::from(2));
        assert_eq!(event.context["mode"], Value::from("active"));
        assert!(event.created_at_ms > 0);
    }

    #[test]
    fn test_alert_severity() {
        let warn = Alert::new(
            "eng",
            AlertKind::HighUtilization {
                utilization: 0.7,
                threshold: 0.7,
            },
        );
        assert_eq!(warn.severity, AlertSeverity::Warning);

        let crit = Alert::new(
            "eng",
            AlertKind::LowSuccessRatio {
                success_ratio: 0.2,
                threshold: 0.8,
            },
        );
        assert_eq!(crit.severity, AlertSeverity::Critical);
        assert_eq!(crit.severity.to_string(), "CRITICAL");
    }
}
