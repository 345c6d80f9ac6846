//! Tests for the in-memory key/value store

use std::sync::Arc;
use std::thread;

use agency_runtime::core::KeyValueStore;
use agency_runtime::infra::InMemoryStore;
use serde_json::json;

#[test]
fn test_overwrite_replaces_value() {
    let store = InMemoryStore::new();
    store.put("tasks/sr/1", json!({"status": "failed"})).unwrap();
    store.put("tasks/sr/1", json!({"status": "completed"})).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("tasks/sr/1").unwrap().unwrap()["status"], "completed");
}

#[test]
fn test_concurrent_writers() {
    let store = Arc::new(InMemoryStore::new());
    let writers: Vec<_> = (0..4)
        .map(|t| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..25 {
                    store.put(&format!("tasks/d{t}/{i:02}"), json!(i)).unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    assert_eq!(store.len(), 100);
    assert_eq!(store.keys("tasks/d2/").unwrap().len(), 25);
}

#[test]
fn test_delete_missing_key() {
    let store = InMemoryStore::new();
    assert!(store.delete("absent").unwrap().is_none());
}
