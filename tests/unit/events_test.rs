//! Tests for collaborator sinks

use agency_runtime::core::{
    Alert, AlertKind, AlertSeverity, AlertSink, FailureRecord, InMemoryAlertSink,
    InMemoryMetricsSink, LogEvent, LogLevel, LogSink, MetricsSink, ResourceMonitor,
    TracingLogSink,
};
use uuid::Uuid;

#[test]
fn test_alert_sink_keeps_latest() {
    let sink = InMemoryAlertSink::new(2);
    for utilization in [0.7, 0.8, 1.0] {
        sink.raise(&Alert::new(
            "engineering",
            AlertKind::HighUtilization {
                utilization,
                threshold: 0.7,
            },
        ));
    }

    let alerts = sink.alerts();
    assert_eq!(alerts.len(), 2);
    assert_eq!(alerts[1].severity, AlertSeverity::Critical);
    sink.clear();
    assert!(sink.alerts().is_empty());
}

#[test]
fn test_metrics_sink_records_snapshots_and_failures() {
    let sink = InMemoryMetricsSink::new(8);
    let monitor = ResourceMonitor::new("ops", 10);
    let policy = agency_runtime::core::DepartmentPolicy::from(
        &agency_runtime::config::DepartmentConfig::default(),
    );
    sink.record_snapshot(&monitor.observe(2, 1, &policy));
    sink.record_failure(&FailureRecord {
        department: "ops".into(),
        task_id: Uuid::new_v4(),
        capability: "deploy".into(),
        error: "permanent execution error: nope".into(),
        attempts: 1,
        created_at_ms: 0,
    });

    let snapshots = sink.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert!((snapshots[0].utilization - 0.4).abs() < 1e-9);
    assert_eq!(snapshots[0].queued, 1);
    assert_eq!(sink.failures()[0].capability, "deploy");
}

#[test]
fn test_tracing_log_sink_accepts_events() {
    // No subscriber installed; must not panic.
    TracingLogSink.log(LogEvent::new(LogLevel::Error, "department:ops", "task failed").with("attempts", 3));
}

#[test]
fn test_alert_serializes_kind_tag() {
    let alert = Alert::new(
        "analytics",
        AlertKind::LowSuccessRatio {
            success_ratio: 0.6,
            threshold: 0.8,
        },
    );
    let json = serde_json::to_value(&alert).unwrap();
    assert_eq!(json["kind"]["kind"], "low_success_ratio");
    assert_eq!(json["severity"], "warning");
}
