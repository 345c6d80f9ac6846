//! Provider lifecycle state machine.
//!
//! A [`Provider`] wraps one [`Capability`] with its validated configuration,
//! operating mode and a bounded log of per-operation state. Execution goes
//! through a [`ProviderLease`]: the scheduler binds a task to a provider by
//! acquiring a lease, and the mode decides how many leases may be out at
//! once. `configure` and `reset` take the same lock as lease acquisition and
//! are refused while any lease is held.

pub mod capability;
pub mod state;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::core::events::{LogEvent, LogLevel, LogSink, TracingLogSink};
use crate::core::{SchedulerError, Task};

pub use capability::{Capability, FnCapability, OptionSchema, ProviderOptions};
pub use state::{OperationStatus, StateLog, StateRecord, DEFAULT_STATE_CAPACITY};

/// Default number of concurrent leases an adaptive provider hands out.
pub const DEFAULT_ADAPTIVE_LIMIT: usize = 4;

/// Operating mode of a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderMode {
    /// Accepts no new work.
    Passive,
    /// One task at a time.
    Active,
    /// Concurrent work up to the adaptive limit.
    Adaptive,
}

impl fmt::Display for ProviderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passive => write!(f, "passive"),
            Self::Active => write!(f, "active"),
            Self::Adaptive => write!(f, "adaptive"),
        }
    }
}

/// Concurrency hint layered on top of [`ProviderMode`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionHint {
    /// Calls must not overlap; caps an adaptive provider at one lease.
    Sync,
    /// Calls may overlap.
    #[default]
    Async,
}

#[derive(Debug)]
struct ProviderInner {
    config: Option<Arc<ProviderOptions>>,
    mode: ProviderMode,
    state: StateLog,
    in_flight: usize,
    waker: Option<Arc<Notify>>,
}

impl ProviderInner {
    fn wake(&self) {
        if let Some(waker) = &self.waker {
            waker.notify_one();
        }
    }
}

/// A capability unit with configuration, mode and state.
pub struct Provider {
    id: Uuid,
    name: String,
    capability: Arc<dyn Capability>,
    schema: OptionSchema,
    default_mode: ProviderMode,
    hint: ExecutionHint,
    adaptive_limit: usize,
    inner: Mutex<ProviderInner>,
    log: Arc<dyn LogSink>,
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.capability.kind())
            .field("default_mode", &self.default_mode)
            .field("hint", &self.hint)
            .finish_non_exhaustive()
    }
}

impl Provider {
    /// Create an unconfigured provider in [`ProviderMode::Active`].
    pub fn new(name: impl Into<String>, capability: impl Capability) -> Self {
        Self::from_arc(name, Arc::new(capability))
    }

    /// Create a provider around a shared capability.
    pub fn from_arc(name: impl Into<String>, capability: Arc<dyn Capability>) -> Self {
        let schema = capability.schema();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            capability,
            schema,
            default_mode: ProviderMode::Active,
            hint: ExecutionHint::default(),
            adaptive_limit: DEFAULT_ADAPTIVE_LIMIT,
            inner: Mutex::new(ProviderInner {
                config: None,
                mode: ProviderMode::Active,
                state: StateLog::default(),
                in_flight: 0,
                waker: None,
            }),
            log: Arc::new(TracingLogSink),
        }
    }

    /// Set the default mode; the provider starts in it and `reset` returns to it.
    #[must_use]
    pub fn with_default_mode(mut self, mode: ProviderMode) -> Self {
        self.default_mode = mode;
        self.inner.get_mut().mode = mode;
        self
    }

    /// Set the execution hint.
    #[must_use]
    pub const fn with_hint(mut self, hint: ExecutionHint) -> Self {
        self.hint = hint;
        self
    }

    /// Set the adaptive concurrency limit (minimum 1).
    #[must_use]
    pub fn with_adaptive_limit(mut self, limit: usize) -> Self {
        self.adaptive_limit = limit.max(1);
        self
    }

    /// Set how many operation ids the state log retains.
    #[must_use]
    pub fn with_state_capacity(mut self, capacity: usize) -> Self {
        self.inner.get_mut().state = StateLog::new(capacity);
        self
    }

    /// Route lifecycle events to `sink`.
    #[must_use]
    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.log = sink;
        self
    }

    /// Generated identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Provider name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capability kind tasks are routed by.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.capability.kind()
    }

    /// Declared option set.
    #[must_use]
    pub const fn schema(&self) -> &OptionSchema {
        &self.schema
    }

    /// Current mode.
    #[must_use]
    pub fn mode(&self) -> ProviderMode {
        self.inner.lock().mode
    }

    /// Mode restored by `reset`.
    #[must_use]
    pub const fn default_mode(&self) -> ProviderMode {
        self.default_mode
    }

    /// Execution hint.
    #[must_use]
    pub const fn hint(&self) -> ExecutionHint {
        self.hint
    }

    /// Whether `configure` has succeeded.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.inner.lock().config.is_some()
    }

    /// Stored configuration.
    #[must_use]
    pub fn config(&self) -> Option<Arc<ProviderOptions>> {
        self.inner.lock().config.clone()
    }

    /// Leases currently held.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inner.lock().in_flight
    }

    /// Record for one operation id.
    #[must_use]
    pub fn state_record(&self, operation: &str) -> Option<StateRecord> {
        self.inner.lock().state.get(operation).cloned()
    }

    /// Copy of the state log.
    #[must_use]
    pub fn state(&self) -> StateLog {
        self.inner.lock().state.clone()
    }

    /// `(finished, failed)` operation counts in the retained state.
    #[must_use]
    pub fn outcome_counts(&self) -> (usize, usize) {
        self.inner.lock().state.outcome_counts()
    }

    const fn lease_limit(&self, mode: ProviderMode) -> usize {
        match (mode, self.hint) {
            (ProviderMode::Passive, _) => 0,
            (ProviderMode::Active, _) | (ProviderMode::Adaptive, ExecutionHint::Sync) => 1,
            (ProviderMode::Adaptive, ExecutionHint::Async) => self.adaptive_limit,
        }
    }

    /// Whether a lease could be granted right now.
    #[must_use]
    pub fn can_accept(&self) -> bool {
        let inner = self.inner.lock();
        inner.config.is_some() && inner.in_flight < self.lease_limit(inner.mode)
    }

    /// Notify `waker` whenever this provider may have become able to take work.
    pub(crate) fn attach_waker(&self, waker: Arc<Notify>) {
        self.inner.lock().waker = Some(waker);
    }

    fn component(&self) -> String {
        format!("provider:{}", self.name)
    }

    fn emit(&self, level: LogLevel, message: &str) -> LogEvent {
        LogEvent::new(level, self.component(), message)
            .with("provider_id", self.id.to_string())
            .with("kind", self.kind())
    }

    /// Validate and store options.
    ///
    /// Re-applying the stored options is a no-op.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ConcurrentMutation`] while a lease is held, or
    /// [`SchedulerError::Configuration`] naming the first offending key.
    pub fn configure(&self, options: ProviderOptions) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        if inner.in_flight > 0 {
            return Err(SchedulerError::ConcurrentMutation(format!(
                "provider `{}` has {} task(s) in flight",
                self.name, inner.in_flight
            )));
        }
        self.schema.validate(&self.name, &options)?;
        if inner.config.as_deref() == Some(&options) {
            return Ok(());
        }
        let keys: Vec<Value> = options.keys().cloned().map(Value::String).collect();
        inner.config = Some(Arc::new(options));
        inner.wake();
        drop(inner);
        self.log
            .log(self.emit(LogLevel::Info, "provider configured").with("keys", keys));
        Ok(())
    }

    /// Clear state and restore the default mode. Configuration is kept.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::ConcurrentMutation`] while a lease is held.
    pub fn reset(&self) -> Result<(), SchedulerError> {
        let mut inner = self.inner.lock();
        if inner.in_flight > 0 {
            return Err(SchedulerError::ConcurrentMutation(format!(
                "provider `{}` cannot reset with {} task(s) in flight",
                self.name, inner.in_flight
            )));
        }
        inner.state.clear();
        inner.mode = self.default_mode;
        inner.wake();
        drop(inner);
        self.log.log(
            self.emit(LogLevel::Info, "provider reset")
                .with("mode", self.default_mode.to_string()),
        );
        Ok(())
    }

    /// Switch operating mode. Held leases are unaffected.
    pub fn set_mode(&self, mode: ProviderMode) {
        let previous = {
            let mut inner = self.inner.lock();
            let previous = std::mem::replace(&mut inner.mode, mode);
            inner.wake();
            previous
        };
        if previous != mode {
            self.log.log(
                self.emit(LogLevel::Info, "mode_change")
                    .with("from", previous.to_string())
                    .with("to", mode.to_string()),
            );
        }
    }

    /// Bind the provider to one task.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Configuration`] if unconfigured, or
    /// [`SchedulerError::ProviderUnavailable`] if the mode allows no more leases.
    pub fn try_lease(self: &Arc<Self>) -> Result<ProviderLease, SchedulerError> {
        let mut inner = self.inner.lock();
        if inner.config.is_none() {
            return Err(SchedulerError::Configuration {
                provider: self.name.clone(),
                key: None,
                reason: "provider is not configured".into(),
            });
        }
        let limit = self.lease_limit(inner.mode);
        if inner.in_flight >= limit {
            return Err(SchedulerError::ProviderUnavailable(format!(
                "provider `{}` is {} with {}/{} lease(s) held",
                self.name, inner.mode, inner.in_flight, limit
            )));
        }
        inner.in_flight += 1;
        Ok(ProviderLease {
            provider: Arc::clone(self),
        })
    }

    /// Lease and execute in one step.
    ///
    /// # Errors
    ///
    /// Lease errors from [`Provider::try_lease`] or the classified call error.
    pub async fn execute(self: &Arc<Self>, task: &Task) -> Result<Value, SchedulerError> {
        self.try_lease()?.execute(task).await
    }
}

/// Exclusive binding of one task to a provider. Released on drop.
#[derive(Debug)]
pub struct ProviderLease {
    provider: Arc<Provider>,
}

impl ProviderLease {
    /// Provider this lease is bound to.
    #[must_use]
    pub const fn provider(&self) -> &Arc<Provider> {
        &self.provider
    }

    /// Invoke the capability for `task` under `task.timeout()`.
    ///
    /// The call runs on its own tokio task. On deadline expiry it is aborted
    /// and abandoned; a call that ignores cancellation keeps running detached.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Timeout`] on expiry, otherwise the classified
    /// capability error. A panicking call is a permanent failure.
    pub async fn execute(&self, task: &Task) -> Result<Value, SchedulerError> {
        let provider = &self.provider;
        let operation = task.id().to_string();
        let config = {
            let mut inner = provider.inner.lock();
            let Some(config) = inner.config.clone() else {
                return Err(SchedulerError::Configuration {
                    provider: provider.name.clone(),
                    key: None,
                    reason: "provider is not configured".into(),
                });
            };
            inner
                .state
                .record(&operation, task.payload().clone(), OperationStatus::Active);
            config
        };

        tracing::debug!(provider = %provider.name, task_id = %operation, "invoking capability");
        let capability = Arc::clone(&provider.capability);
        let payload = task.payload().clone();
        let call = tokio::spawn(async move { capability.invoke(&config, payload).await });
        let abort = call.abort_handle();

        let result = match tokio::time::timeout(task.timeout(), call).await {
            Ok(Ok(Ok(value))) => Ok(value),
            Ok(Ok(Err(err))) => Err(err.classify()),
            Ok(Err(join_err)) => Err(SchedulerError::PermanentExecution(format!(
                "capability call aborted: {join_err}"
            ))),
            Err(_) => {
                abort.abort();
                Err(SchedulerError::Timeout(task.timeout()))
            }
        };

        let status = if result.is_ok() {
            OperationStatus::Completed
        } else {
            OperationStatus::Failed
        };
        provider.inner.lock().state.mark(&operation, status);

        match &result {
            Ok(_) => provider.log.log(
                provider
                    .emit(LogLevel::Debug, "operation completed")
                    .with("task_id", operation),
            ),
            Err(err) => provider.log.log(
                provider
                    .emit(LogLevel::Warn, "operation failed")
                    .with("task_id", operation)
                    .with("error", err.to_string())
                    .with("retryable", err.is_retryable()),
            ),
        }
        result
    }
}

impl Drop for ProviderLease {
    fn drop(&mut self) {
        let mut inner = self.provider.inner.lock();
        inner.in_flight = inner.in_flight.saturating_sub(1);
        inner.wake();
    }
}
