//! Per-department scheduler: admission, priority dispatch, deadlines, retry,
//! and the resource manager tick.
//!
//! Slots are reserved with a CAS loop on the in-flight counter, the queue
//! sits behind a short `parking_lot` mutex, and every event that can free a
//! slot or a provider pumps the queue again. Tasks run on their own tokio
//! tasks; no task moves between workers once bound.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::{DepartmentConfig, OrchestrationConfig};
use crate::core::events::{FailureRecord, LogEvent, LogLevel, Sinks};
use crate::core::monitor::{MetricsSnapshot, ResourceMonitor};
use crate::core::provider::{Provider, ProviderLease};
use crate::core::queue::TaskQueue;
use crate::core::store::KeyValueStore;
use crate::core::task::Ticket;
use crate::core::{SchedulerError, Task, TaskFailure, TaskHandle, TaskId, TaskReport, TaskStatus};
use crate::infra::queue::InMemoryQueue;
use crate::util::clock::now_ms;
use crate::util::shutdown::stopped;

/// Thresholds a department schedules under.
///
/// Swapped as a whole by the governance loop; in-flight work keeps running
/// under whatever policy dispatched it.
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentPolicy {
    /// Concurrency cap.
    pub max_concurrent_tasks: usize,
    /// Minimum acceptable success ratio.
    pub evaluation_threshold: f64,
    /// Utilization at which dispatch pauses.
    pub resource_utilization_threshold: f64,
    /// Utilization at which an alert fires.
    pub alert_threshold: f64,
    /// Rolling window length.
    pub performance_window: usize,
    /// Metrics tick period.
    pub metrics_update_interval: Duration,
    /// Whether work is subject to review.
    pub code_review_required: bool,
}

impl From<&DepartmentConfig> for DepartmentPolicy {
    fn from(cfg: &DepartmentConfig) -> Self {
        Self {
            max_concurrent_tasks: cfg.max_concurrent_tasks,
            evaluation_threshold: cfg.evaluation_threshold,
            resource_utilization_threshold: cfg.resource_utilization_threshold,
            alert_threshold: cfg.alert_threshold,
            performance_window: cfg.performance_window,
            metrics_update_interval: cfg.metrics_interval(),
            code_review_required: cfg.code_review_required,
        }
    }
}

impl DepartmentPolicy {
    /// Check the policy can be applied.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be greater than 0".into());
        }
        if self.performance_window == 0 {
            return Err("performance_window must be greater than 0".into());
        }
        for (name, value) in [
            ("evaluation_threshold", self.evaluation_threshold),
            ("resource_utilization_threshold", self.resource_utilization_threshold),
            ("alert_threshold", self.alert_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!("{name} must be between 0 and 1, got {value}"));
            }
        }
        if self.resource_utilization_threshold == 0.0 {
            return Err("resource_utilization_threshold must be greater than 0".into());
        }
        if self.metrics_update_interval.is_zero() {
            return Err("metrics_update_interval must be positive".into());
        }
        Ok(())
    }

    /// Utilization with `in_flight` tasks running.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn utilization(&self, in_flight: usize) -> f64 {
        in_flight as f64 / self.max_concurrent_tasks.max(1) as f64
    }
}

enum Binding {
    Leased(ProviderLease),
    Busy,
    Unusable(SchedulerError),
}

struct Shared {
    name: String,
    policy: RwLock<Arc<DepartmentPolicy>>,
    queue: Mutex<InMemoryQueue<Ticket>>,
    in_flight: AtomicUsize,
    sequence: AtomicU64,
    providers: RwLock<Vec<Arc<Provider>>>,
    monitor: ResourceMonitor,
    sinks: Sinks,
    store: Option<Arc<dyn KeyValueStore>>,
    wake: Arc<Notify>,
    space: Notify,
    retune: Notify,
    runtime: RwLock<Option<Handle>>,
    shutdown: watch::Sender<bool>,
}

/// One department: queue, worker slots, providers and resource monitor.
pub struct Department {
    shared: Arc<Shared>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl std::fmt::Debug for Department {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Department")
            .field("name", &self.shared.name)
            .field("in_flight", &self.in_flight())
            .field("queued", &self.queued())
            .finish_non_exhaustive()
    }
}

impl Department {
    /// Build a stopped department.
    pub fn new(
        name: impl Into<String>,
        config: &DepartmentConfig,
        orchestration: &OrchestrationConfig,
        sinks: Sinks,
        store: Option<Arc<dyn KeyValueStore>>,
    ) -> Self {
        let name = name.into();
        let (shutdown, _) = watch::channel(true);
        Self {
            shared: Arc::new(Shared {
                monitor: ResourceMonitor::new(name.clone(), config.performance_window),
                name,
                policy: RwLock::new(Arc::new(DepartmentPolicy::from(config))),
                queue: Mutex::new(InMemoryQueue::new(orchestration.queue_size)),
                in_flight: AtomicUsize::new(0),
                sequence: AtomicU64::new(0),
                providers: RwLock::new(Vec::new()),
                sinks,
                store,
                wake: Arc::new(Notify::new()),
                space: Notify::new(),
                retune: Notify::new(),
                runtime: RwLock::new(None),
                shutdown,
            }),
            loops: Mutex::new(Vec::new()),
        }
    }

    /// Department name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Current policy.
    #[must_use]
    pub fn policy(&self) -> Arc<DepartmentPolicy> {
        self.shared.policy()
    }

    /// Atomically replace the policy, returning the previous one.
    ///
    /// Affects future admission and dispatch only.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] if the policy fails validation.
    pub fn swap_policy(&self, policy: DepartmentPolicy) -> Result<Arc<DepartmentPolicy>, SchedulerError> {
        policy
            .validate()
            .map_err(|e| SchedulerError::InvalidConfig(format!("department `{}`: {e}", self.name())))?;
        if policy.performance_window != self.policy().performance_window {
            self.shared.monitor.resize(policy.performance_window);
        }
        let next = Arc::new(policy);
        let previous = std::mem::replace(&mut *self.shared.policy.write(), Arc::clone(&next));
        if next.metrics_update_interval != previous.metrics_update_interval {
            self.shared.retune.notify_one();
        }
        self.shared.sinks.log.log(
            self.shared
                .event(LogLevel::Info, "policy swapped")
                .with("max_concurrent_tasks", next.max_concurrent_tasks)
                .with("previous_max_concurrent_tasks", previous.max_concurrent_tasks),
        );
        // A raised cap may free slots for queued work.
        self.shared.wake.notify_one();
        Ok(previous)
    }

    /// Add a provider to this department's pool.
    pub fn register_provider(&self, provider: Arc<Provider>) {
        provider.attach_waker(Arc::clone(&self.shared.wake));
        self.shared.sinks.log.log(
            self.shared
                .event(LogLevel::Info, "provider registered")
                .with("provider", provider.name())
                .with("kind", provider.kind()),
        );
        self.shared.providers.write().push(provider);
        self.shared.wake.notify_one();
    }

    /// Registered providers.
    #[must_use]
    pub fn providers(&self) -> Vec<Arc<Provider>> {
        self.shared.providers.read().clone()
    }

    /// Tasks holding a worker slot.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    /// Tasks waiting in the queue.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Whether the department accepts submissions.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Admit a task.
    ///
    /// The task is queued PENDING and dispatched at once if a slot and a
    /// provider are free.
    ///
    /// # Errors
    ///
    /// - [`SchedulerError::NotRunning`] before `start` or after `stop`.
    /// - [`SchedulerError::ProviderUnavailable`] if no provider serves the capability.
    /// - [`SchedulerError::ResourceExhausted`] if the queue is full and the last
    ///   published utilization is at the resource threshold.
    /// - [`SchedulerError::QueueFull`] if the queue is full otherwise.
    pub fn submit(&self, task: Task) -> Result<TaskHandle, SchedulerError> {
        let shared = &self.shared;
        if !shared
            .providers
            .read()
            .iter()
            .any(|p| p.kind() == task.capability())
        {
            return Err(SchedulerError::ProviderUnavailable(format!(
                "department `{}` has no provider for capability `{}`",
                shared.name,
                task.capability()
            )));
        }

        let handle = {
            let mut queue = shared.queue.lock();
            if !shared.is_running() {
                return Err(SchedulerError::NotRunning);
            }
            if queue.is_full() {
                let policy = shared.policy();
                let utilization = shared.monitor.published_utilization();
                tracing::warn!(
                    department = %shared.name,
                    task_id = %task.id(),
                    depth = queue.len(),
                    utilization,
                    "task rejected at admission"
                );
                if utilization >= policy.resource_utilization_threshold {
                    return Err(SchedulerError::ResourceExhausted(format!(
                        "department `{}` at utilization {utilization:.2} with {} queued",
                        shared.name,
                        queue.len()
                    )));
                }
                return Err(SchedulerError::QueueFull(format!(
                    "department `{}` queue holds {} task(s)",
                    shared.name,
                    queue.len()
                )));
            }
            let (ticket, handle) = Ticket::issue(task, shared.next_sequence());
            shared.sinks.log.log(
                shared
                    .event(LogLevel::Debug, "task admitted")
                    .with("task_id", ticket.task.id().to_string())
                    .with("priority", format!("{:?}", ticket.task.priority()))
                    .with("queued", queue.len() + 1),
            );
            queue.enqueue(ticket)?;
            handle
        };
        shared.pump();
        Ok(handle)
    }

    /// Live snapshot without publishing it.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let policy = self.policy();
        self.shared
            .monitor
            .observe(self.in_flight(), self.queued(), &policy)
    }

    /// Last snapshot published by a metrics tick.
    #[must_use]
    pub fn published(&self) -> Option<MetricsSnapshot> {
        self.shared.monitor.published()
    }

    /// Run one metrics tick now: recompute, alert, publish.
    pub fn refresh(&self) -> MetricsSnapshot {
        self.shared.refresh()
    }

    /// Stored terminal report for `id`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Storage`] on store failure or an undecodable report.
    pub fn task_report(&self, id: TaskId) -> Result<Option<TaskReport>, SchedulerError> {
        let Some(store) = &self.shared.store else {
            return Ok(None);
        };
        store
            .get(&self.shared.report_key(id))?
            .map(|v| {
                serde_json::from_value(v)
                    .map_err(|e| SchedulerError::Storage(format!("corrupt task report {id}: {e}")))
            })
            .transpose()
    }

    /// Start the dispatcher and metrics loops on `runtime`. Idempotent.
    pub fn start(&self, runtime: &Handle) {
        {
            let mut slot = self.shared.runtime.write();
            if slot.is_some() {
                return;
            }
            *slot = Some(runtime.clone());
        }
        self.shared.shutdown.send_replace(false);
        let mut loops = self.loops.lock();
        loops.push(runtime.spawn(dispatch_loop(Arc::clone(&self.shared))));
        loops.push(runtime.spawn(metrics_loop(Arc::clone(&self.shared))));
        self.shared
            .sinks
            .log
            .log(self.shared.event(LogLevel::Info, "department started"));
        self.shared.pump();
    }

    /// Stop accepting work and fail every queued task with `Shutdown`. Idempotent.
    ///
    /// Running tasks finish their current attempt; they are not retried.
    pub fn stop(&self) {
        if self.shared.runtime.write().take().is_none() {
            return;
        }
        self.shared.shutdown.send_replace(true);
        for handle in self.loops.lock().drain(..) {
            handle.abort();
        }
        let drained = self.shared.queue.lock().drain_ordered();
        self.shared.space.notify_waiters();
        let dropped = drained.len();
        for ticket in drained {
            self.shared.fail(ticket, SchedulerError::Shutdown);
        }
        self.shared.sinks.log.log(
            self.shared
                .event(LogLevel::Info, "department stopped")
                .with("dropped", dropped),
        );
    }
}

impl Drop for Department {
    fn drop(&mut self) {
        for handle in self.loops.get_mut().drain(..) {
            handle.abort();
        }
    }
}

impl Shared {
    fn policy(&self) -> Arc<DepartmentPolicy> {
        Arc::clone(&self.policy.read())
    }

    fn is_running(&self) -> bool {
        self.runtime.read().is_some()
    }

    fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    fn event(&self, level: LogLevel, message: &str) -> LogEvent {
        LogEvent::new(level, format!("department:{}", self.name), message)
    }

    fn report_key(&self, id: TaskId) -> String {
        format!("tasks/{}/{id}", self.name)
    }

    /// Reserve a worker slot using a CAS loop.
    ///
    /// Fails at the slot cap or while utilization is at the resource threshold.
    fn try_reserve_slot(&self, policy: &DepartmentPolicy) -> bool {
        let cap = policy.max_concurrent_tasks;
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            if current >= cap || policy.utilization(current) >= policy.resource_utilization_threshold {
                return false;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn release_slot(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }

    fn bind(&self, capability: &str) -> Binding {
        let providers = self.providers.read();
        let mut busy = false;
        let mut unusable = None;
        for provider in providers.iter().filter(|p| p.kind() == capability) {
            match provider.try_lease() {
                Ok(lease) => return Binding::Leased(lease),
                Err(SchedulerError::ProviderUnavailable(_)) => busy = true,
                Err(err) => {
                    unusable.get_or_insert(err);
                }
            }
        }
        if busy {
            return Binding::Busy;
        }
        Binding::Unusable(unusable.unwrap_or_else(|| {
            SchedulerError::ProviderUnavailable(format!("no provider for capability `{capability}`"))
        }))
    }

    /// Dispatch queued tasks while slots and providers allow.
    fn pump(self: &Arc<Self>) {
        let Some(runtime) = self.runtime.read().clone() else {
            return;
        };
        loop {
            let policy = self.policy();
            if !self.try_reserve_slot(&policy) {
                return;
            }
            let picked = {
                let mut queue = self.queue.lock();
                let mut bound = None;
                let ticket = queue.dequeue_first(&mut |ticket: &Ticket| {
                    match self.bind(ticket.task.capability()) {
                        Binding::Leased(lease) => {
                            bound = Some(Ok(lease));
                            true
                        }
                        Binding::Unusable(err) => {
                            bound = Some(Err(err));
                            true
                        }
                        Binding::Busy => false,
                    }
                });
                ticket.zip(bound)
            };
            let Some((ticket, bound)) = picked else {
                self.release_slot();
                return;
            };
            self.space.notify_one();
            match bound {
                Ok(lease) => {
                    tracing::debug!(
                        department = %self.name,
                        task_id = %ticket.task.id(),
                        provider = %lease.provider().name(),
                        "dispatching task"
                    );
                    runtime.spawn(run(Arc::clone(self), ticket, lease));
                }
                Err(err) => {
                    self.release_slot();
                    self.fail(ticket, err);
                }
            }
        }
    }

    fn finish(self: &Arc<Self>, mut ticket: Ticket, result: Result<Value, SchedulerError>) {
        let error = match result {
            Ok(output) => {
                self.monitor.record_outcome(true);
                ticket.transition(TaskStatus::Completed);
                self.store_report(&ticket, Some(&output), None);
                self.sinks.log.log(
                    self.event(LogLevel::Info, "task completed")
                        .with("task_id", ticket.task.id().to_string())
                        .with("attempts", ticket.attempts),
                );
                ticket.resolve(Ok(output));
                return;
            }
            Err(error) => error,
        };

        ticket.transition(TaskStatus::Failed);
        let retry_runtime = if error.is_retryable() && !self.is_shutting_down() {
            self.runtime.read().clone()
        } else {
            None
        };
        if let Some(runtime) = retry_runtime.filter(|_| ticket.take_retry()) {
            let delay = ticket.task.retry_delay();
            self.sinks.log.log(
                self.event(LogLevel::Warn, "task attempt failed, retrying")
                    .with("task_id", ticket.task.id().to_string())
                    .with("attempts", ticket.attempts)
                    .with("remaining_retries", ticket.remaining_retries)
                    .with("error", error.to_string()),
            );
            runtime.spawn(readmit(Arc::clone(self), ticket, delay));
        } else {
            self.fail(ticket, error);
        }
    }

    /// Terminal failure: window, metrics, store, handle.
    fn fail(&self, ticket: Ticket, error: SchedulerError) {
        if ticket.status() != TaskStatus::Failed {
            ticket.transition(TaskStatus::Failed);
        }
        if error != SchedulerError::Shutdown {
            self.monitor.record_outcome(false);
        }
        self.sinks.metrics.record_failure(&FailureRecord {
            department: self.name.clone(),
            task_id: ticket.task.id(),
            capability: ticket.task.capability().to_owned(),
            error: error.to_string(),
            attempts: ticket.attempts,
            created_at_ms: now_ms(),
        });
        self.store_report(&ticket, None, Some(&error));
        self.sinks.log.log(
            self.event(LogLevel::Error, "task failed")
                .with("task_id", ticket.task.id().to_string())
                .with("attempts", ticket.attempts)
                .with("error", error.to_string()),
        );
        let attempts = ticket.attempts;
        ticket.resolve(Err(TaskFailure { error, attempts }));
    }

    fn store_report(&self, ticket: &Ticket, output: Option<&Value>, error: Option<&SchedulerError>) {
        let Some(store) = &self.store else {
            return;
        };
        let report = TaskReport {
            task_id: ticket.task.id(),
            department: self.name.clone(),
            capability: ticket.task.capability().to_owned(),
            status: ticket.status(),
            attempts: ticket.attempts,
            output: output.cloned(),
            error: error.map(ToString::to_string),
            finished_at_ms: now_ms(),
        };
        let stored = serde_json::to_value(&report)
            .map_err(|e| SchedulerError::Storage(e.to_string()))
            .and_then(|value| store.put(&self.report_key(report.task_id), value));
        if let Err(err) = stored {
            tracing::error!(department = %self.name, task_id = %report.task_id, "failed to store task report: {err}");
        }
    }

    fn refresh(&self) -> MetricsSnapshot {
        let policy = self.policy();
        let queued = self.queue.lock().len();
        let snapshot = self
            .monitor
            .observe(self.in_flight.load(Ordering::Acquire), queued, &policy);
        for alert in self.monitor.alerts(&snapshot, &policy) {
            self.sinks.log.log(
                self.event(LogLevel::Warn, "alert raised")
                    .with("severity", alert.severity.to_string())
                    .with("utilization", snapshot.utilization)
                    .with("success_ratio", snapshot.success_ratio),
            );
            self.sinks.alerts.raise(&alert);
        }
        self.sinks.metrics.record_snapshot(&snapshot);
        self.monitor.publish(snapshot.clone());
        snapshot
    }
}

async fn run(shared: Arc<Shared>, mut ticket: Ticket, lease: ProviderLease) {
    ticket.attempts += 1;
    ticket.transition(TaskStatus::Active);
    let result = lease.execute(&ticket.task).await;
    drop(lease);
    shared.release_slot();
    shared.finish(ticket, result);
    shared.pump();
}

/// Put a failed ticket back after its retry delay, waiting for queue space.
async fn readmit(shared: Arc<Shared>, mut ticket: Ticket, delay: Duration) {
    let mut shutdown = shared.shutdown.subscribe();
    tokio::select! {
        () = tokio::time::sleep(delay) => {}
        () = stopped(&mut shutdown) => {
            shared.fail(ticket, SchedulerError::Shutdown);
            return;
        }
    }
    loop {
        let space = shared.space.notified();
        tokio::pin!(space);
        space.as_mut().enable();
        {
            let mut queue = shared.queue.lock();
            if shared.is_shutting_down() {
                drop(queue);
                shared.fail(ticket, SchedulerError::Shutdown);
                return;
            }
            if !queue.is_full() {
                ticket.seq = shared.next_sequence();
                ticket.transition(TaskStatus::Pending);
                if let Err(err) = queue.enqueue(ticket) {
                    tracing::error!(department = %shared.name, "retry re-admission failed: {err}");
                }
                break;
            }
        }
        tokio::select! {
            () = &mut space => {}
            () = stopped(&mut shutdown) => {}
        }
    }
    shared.pump();
}

async fn dispatch_loop(shared: Arc<Shared>) {
    let mut shutdown = shared.shutdown.subscribe();
    loop {
        tokio::select! {
            () = shared.wake.notified() => shared.pump(),
            () = stopped(&mut shutdown) => break,
        }
    }
}

async fn metrics_ticker(shared: &Shared) -> (Duration, Interval) {
    let period = shared
        .policy()
        .metrics_update_interval
        .max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;
    (period, ticker)
}

async fn metrics_loop(shared: Arc<Shared>) {
    let mut shutdown = shared.shutdown.subscribe();
    let (mut period, mut ticker) = metrics_ticker(&shared).await;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                shared.refresh();
                shared.pump();
            }
            () = shared.retune.notified() => {
                let current = shared.policy().metrics_update_interval.max(Duration::from_millis(1));
                if current != period {
                    tracing::debug!(department = %shared.name, ?current, "metrics interval changed");
                    (period, ticker) = metrics_ticker(&shared).await;
                }
            }
            () = stopped(&mut shutdown) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config() {
        let cfg = DepartmentConfig {
            max_concurrent_tasks: 3,
            metrics_update_interval: 0.5,
            ..DepartmentConfig::default()
        };
        let policy = DepartmentPolicy::from(&cfg);
        assert_eq!(policy.max_concurrent_tasks, 3);
        assert_eq!(policy.metrics_update_interval, Duration::from_millis(500));
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_policy_validation() {
        let mut policy = DepartmentPolicy::from(&DepartmentConfig::default());
        policy.max_concurrent_tasks = 0;
        assert!(policy.validate().is_err());
        policy.max_concurrent_tasks = 1;
        policy.alert_threshold = 1.5;
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_slot_reservation_respects_threshold() {
        let cfg = DepartmentConfig {
            max_concurrent_tasks: 5,
            resource_utilization_threshold: 0.8,
            ..DepartmentConfig::default()
        };
        let orchestration = OrchestrationConfig {
            max_workers: 16,
            ..OrchestrationConfig::default()
        };
        let dept = Department::new("ops", &cfg, &orchestration, Sinks::default(), None);
        let policy = dept.policy();
        let reserved = (0..10).filter(|_| dept.shared.try_reserve_slot(&policy)).count();
        // Dispatch pauses once 4/5 = 0.8 is reached.
        assert_eq!(reserved, 4);
    }

    #[test]
    fn test_slot_cap_independent_of_max_workers() {
        let cfg = DepartmentConfig {
            max_concurrent_tasks: 5,
            resource_utilization_threshold: 1.0,
            ..DepartmentConfig::default()
        };
        let orchestration = OrchestrationConfig {
            max_workers: 2,
            ..OrchestrationConfig::default()
        };
        let dept = Department::new("ops", &cfg, &orchestration, Sinks::default(), None);
        let policy = dept.policy();
        let reserved = (0..10).filter(|_| dept.shared.try_reserve_slot(&policy)).count();
        assert_eq!(reserved, 5);
    }

    #[test]
    fn test_submit_without_provider_rejected() {
        let dept = Department::new(
            "ops",
            &DepartmentConfig::default(),
            &OrchestrationConfig::default(),
            Sinks::default(),
            None,
        );
        let err = dept.submit(Task::new("echo", Value::Null)).unwrap_err();
        // No provider is checked first.
        assert!(matches!(err, SchedulerError::ProviderUnavailable(_)));
    }
}
