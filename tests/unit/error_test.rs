//! Tests for error types

use std::time::Duration;

use agency_runtime::core::{CapabilityError, SchedulerError, TaskFailure};

#[test]
fn test_queue_full_error() {
    let err = SchedulerError::QueueFull("engineering".to_string());
    assert_eq!(format!("{}", err), "queue full: engineering");
}

#[test]
fn test_configuration_error_names_provider() {
    let err = SchedulerError::Configuration {
        provider: "search".into(),
        key: Some("model".into()),
        reason: "missing required option `model`".into(),
    };
    assert_eq!(
        format!("{}", err),
        "configuration error in provider `search`: missing required option `model`"
    );
}

#[test]
fn test_timeout_error_is_retryable() {
    let err = SchedulerError::Timeout(Duration::from_millis(50));
    assert!(err.is_retryable());
    assert_eq!(format!("{}", err), "task timed out after 50ms");
}

#[test]
fn test_capability_errors_classify() {
    assert!(CapabilityError::Transient("io".into()).classify().is_retryable());
    assert!(!CapabilityError::Permanent("bad input".into()).classify().is_retryable());
    let unclassified: CapabilityError = anyhow::anyhow!("unexpected").into();
    assert!(matches!(
        unclassified.classify(),
        SchedulerError::PermanentExecution(_)
    ));
}

#[test]
fn test_task_failure_display() {
    let failure = TaskFailure {
        error: SchedulerError::TransientExecution("flaky".into()),
        attempts: 3,
    };
    assert_eq!(
        format!("{}", failure),
        "transient execution error: flaky (after 3 attempt(s))"
    );
}
