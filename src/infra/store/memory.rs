//! In-memory key/value store.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::Value;

use crate::core::store::KeyValueStore;
use crate::core::SchedulerError;

/// Simple in-memory store for development/testing.
///
/// Keys are kept sorted so prefix listing is deterministic.
#[derive(Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, Value>>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn put(&self, key: &str, value: Value) -> Result<(), SchedulerError> {
        self.entries.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Value>, SchedulerError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<Option<Value>, SchedulerError> {
        Ok(self.entries.write().remove(key))
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, SchedulerError> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_get_delete() {
        let store = InMemoryStore::new();
        store.put("tasks/eng/1", json!({"ok": true})).unwrap();
        assert_eq!(store.get("tasks/eng/1").unwrap(), Some(json!({"ok": true})));
        assert_eq!(store.delete("tasks/eng/1").unwrap(), Some(json!({"ok": true})));
        assert!(store.get("tasks/eng/1").unwrap().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_prefix_listing() {
        let store = InMemoryStore::new();
        store.put("tasks/eng/b", json!(1)).unwrap();
        store.put("tasks/eng/a", json!(2)).unwrap();
        store.put("tasks/ops/a", json!(3)).unwrap();

        assert_eq!(store.keys("tasks/eng/").unwrap(), vec!["tasks/eng/a", "tasks/eng/b"]);
        assert_eq!(store.keys("tasks/").unwrap().len(), 3);
        assert!(store.keys("nothing").unwrap().is_empty());
    }
}
