//! The agency root: owns every department and the governance loop.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::builders::AgencyBuilder;
use crate::config::AgencyConfig;
use crate::core::events::{LogEvent, LogLevel, Sinks};
use crate::core::governance::Governance;
use crate::core::monitor::MetricsSnapshot;
use crate::core::provider::Provider;
use crate::core::store::KeyValueStore;
use crate::core::{Department, SchedulerError, Task, TaskHandle, TaskId, TaskReport};

#[derive(Default)]
struct Lifecycle {
    running: bool,
    governance: Option<(watch::Sender<bool>, JoinHandle<()>)>,
}

/// Explicitly constructed root of one orchestration runtime.
///
/// Nothing runs until [`Agency::start`]; [`Agency::stop`] fails whatever is
/// still queued. Both are idempotent and meant to be driven by one owner.
pub struct Agency {
    config: AgencyConfig,
    departments: BTreeMap<String, Arc<Department>>,
    governance: Arc<Governance>,
    sinks: Sinks,
    store: Arc<dyn KeyValueStore>,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for Agency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agency")
            .field("departments", &self.departments.keys().collect::<Vec<_>>())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Agency {
    /// Build a stopped agency with tracing sinks and an in-memory store.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::InvalidConfig`] if the configuration fails validation.
    pub fn new(config: AgencyConfig) -> Result<Self, SchedulerError> {
        AgencyBuilder::new(config).build()
    }

    /// Start a builder for custom sinks, store or review policy.
    #[must_use]
    pub fn builder(config: AgencyConfig) -> AgencyBuilder {
        AgencyBuilder::new(config)
    }

    pub(crate) fn from_parts(
        config: AgencyConfig,
        departments: BTreeMap<String, Arc<Department>>,
        governance: Arc<Governance>,
        sinks: Sinks,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config,
            departments,
            governance,
            sinks,
            store,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Configuration the agency was built from.
    #[must_use]
    pub const fn config(&self) -> &AgencyConfig {
        &self.config
    }

    /// Department names in order.
    pub fn department_names(&self) -> impl Iterator<Item = &str> {
        self.departments.keys().map(String::as_str)
    }

    /// Look up a department.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownDepartment`] if no department has that name.
    pub fn department(&self, name: &str) -> Result<&Arc<Department>, SchedulerError> {
        self.departments
            .get(name)
            .ok_or_else(|| SchedulerError::UnknownDepartment(name.to_owned()))
    }

    /// The governance loop, for running cycles by hand.
    #[must_use]
    pub const fn governance(&self) -> &Arc<Governance> {
        &self.governance
    }

    /// Key/value store holding terminal task reports.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Attach `provider` to a department, routing its events to the agency log sink.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownDepartment`] if no department has that name.
    pub fn register_provider(
        &self,
        department: &str,
        provider: Provider,
    ) -> Result<Arc<Provider>, SchedulerError> {
        let dept = self.department(department)?;
        let provider = Arc::new(provider.with_log_sink(Arc::clone(&self.sinks.log)));
        dept.register_provider(Arc::clone(&provider));
        Ok(provider)
    }

    /// A task carrying the orchestration defaults for timeout and retries.
    #[must_use]
    pub fn task(&self, capability: impl Into<String>, payload: Value) -> Task {
        let orchestration = &self.config.orchestration;
        Task::new(capability, payload)
            .with_timeout(orchestration.task_timeout())
            .with_max_retries(orchestration.max_retries)
            .with_retry_delay(orchestration.retry_delay())
    }

    /// Submit a task to a department.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownDepartment`], or any admission error from
    /// [`Department::submit`].
    pub fn submit(&self, department: &str, task: Task) -> Result<TaskHandle, SchedulerError> {
        self.department(department)?.submit(task)
    }

    /// Whether `start` has run without a matching `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle.lock().running
    }

    /// Start every department and, if enabled, the governance loop.
    pub async fn start(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.running {
            return;
        }
        let runtime = Handle::current();
        for department in self.departments.values() {
            department.start(&runtime);
        }
        if self.config.governance.enabled {
            let (tx, rx) = watch::channel(false);
            let handle = runtime.spawn(Arc::clone(&self.governance).run(rx));
            lifecycle.governance = Some((tx, handle));
        }
        lifecycle.running = true;
        drop(lifecycle);
        self.sinks.log.log(
            LogEvent::new(LogLevel::Info, "agency", "agency started")
                .with("departments", self.departments.len()),
        );
    }

    /// Stop the governance loop and every department.
    pub async fn stop(&self) {
        let governance = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.running {
                return;
            }
            lifecycle.running = false;
            lifecycle.governance.take()
        };
        if let Some((tx, handle)) = governance {
            tx.send_replace(true);
            if let Err(err) = handle.await {
                tracing::warn!("governance loop ended abnormally: {err}");
            }
        }
        for department in self.departments.values() {
            department.stop();
        }
        self.sinks
            .log
            .log(LogEvent::new(LogLevel::Info, "agency", "agency stopped"));
    }

    /// Live snapshot of every department.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, MetricsSnapshot> {
        self.departments
            .iter()
            .map(|(name, dept)| (name.clone(), dept.snapshot()))
            .collect()
    }

    /// Terminal report of a task, once it has one.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::UnknownDepartment`] or a storage error.
    pub fn task_report(&self, department: &str, id: TaskId) -> Result<Option<TaskReport>, SchedulerError> {
        self.department(department)?.task_report(id)
    }
}
