//! Key/value contract for the external storage collaborator.

use serde_json::Value;

use crate::core::SchedulerError;

/// Minimal key/value storage used for terminal task reports.
///
/// Implementations must be safe to call from completion callbacks on any
/// runtime thread.
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`] on backend failure.
    fn put(&self, key: &str, value: Value) -> Result<(), SchedulerError>;

    /// Fetch the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`] on backend failure.
    fn get(&self, key: &str) -> Result<Option<Value>, SchedulerError>;

    /// Remove `key`, returning the previous value.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`] on backend failure.
    fn delete(&self, key: &str) -> Result<Option<Value>, SchedulerError>;

    /// List keys starting with `prefix`.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Storage`] on backend failure.
    fn keys(&self, prefix: &str) -> Result<Vec<String>, SchedulerError>;
}
