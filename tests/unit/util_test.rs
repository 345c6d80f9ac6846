//! Tests for utility functions

use std::time::Duration;

use agency_runtime::config::LoggingConfig;
use agency_runtime::core::{Priority, Task, DEFAULT_MAX_RETRIES, DEFAULT_TASK_TIMEOUT};
use agency_runtime::util::{init_tracing_with, now_ms, stopped};
use tokio::sync::watch;

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Medium);
    assert!(Priority::Medium > Priority::Low);
    assert_eq!(Priority::default(), Priority::Medium);
}

#[test]
fn test_priority_serde() {
    let json = serde_json::to_string(&Priority::Critical).unwrap();
    assert_eq!(json, "\"critical\"");
}

#[test]
fn test_task_defaults() {
    let task = Task::new("search", serde_json::json!({"q": "x"}));
    assert_eq!(task.timeout(), DEFAULT_TASK_TIMEOUT);
    assert_eq!(task.max_retries(), DEFAULT_MAX_RETRIES);
    assert_eq!(task.priority(), Priority::Medium);
    assert_ne!(task.id(), Task::new("search", serde_json::Value::Null).id());
}

#[test]
fn test_now_ms_advances() {
    let a = now_ms();
    std::thread::sleep(Duration::from_millis(2));
    assert!(now_ms() > a);
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing_with(&LoggingConfig::default());
    init_tracing_with(&LoggingConfig {
        level: "debug".into(),
        json: true,
    });
}

#[tokio::test]
async fn test_stopped_resolves_on_flag() {
    let (tx, mut rx) = watch::channel(false);
    let waiter = tokio::spawn(async move { stopped(&mut rx).await });
    tx.send_replace(true);
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}
