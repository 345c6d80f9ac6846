//! Builders to construct departments and agencies from configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{AgencyConfig, DepartmentConfig};
use crate::core::events::Sinks;
use crate::core::governance::{Governance, ReviewPolicy, ThresholdReview};
use crate::core::store::KeyValueStore;
use crate::core::{Department, SchedulerError};
use crate::infra::InMemoryStore;
use crate::runtime::Agency;

/// Build one stopped department per configured entry.
///
/// # Errors
///
/// [`SchedulerError::InvalidConfig`] if the configuration fails validation.
pub fn build_departments(
    cfg: &AgencyConfig,
    sinks: &Sinks,
    store: &Arc<dyn KeyValueStore>,
) -> Result<BTreeMap<String, Arc<Department>>, SchedulerError> {
    cfg.validate().map_err(SchedulerError::InvalidConfig)?;

    let mut departments = BTreeMap::new();
    for (name, dept_cfg) in &cfg.departments {
        let department = Department::new(
            name.clone(),
            dept_cfg,
            &cfg.orchestration,
            sinks.clone(),
            Some(Arc::clone(store)),
        );
        departments.insert(name.clone(), Arc::new(department));
    }
    Ok(departments)
}

/// Step-by-step construction of an [`Agency`].
///
/// ```rust,ignore
/// let agency = AgencyBuilder::new(AgencyConfig::default())
///     .with_department("research", DepartmentConfig::default())
///     .with_store(Arc::new(InMemoryStore::new()))
///     .build()?;
/// ```
pub struct AgencyBuilder {
    config: AgencyConfig,
    extra: Vec<(String, DepartmentConfig)>,
    sinks: Sinks,
    store: Option<Arc<dyn KeyValueStore>>,
    review: Option<Arc<dyn ReviewPolicy>>,
}

impl AgencyBuilder {
    /// Start from a loaded configuration.
    #[must_use]
    pub fn new(config: AgencyConfig) -> Self {
        Self {
            config,
            extra: Vec::new(),
            sinks: Sinks::default(),
            store: None,
            review: None,
        }
    }

    /// Add a department on top of the configured ones.
    #[must_use]
    pub fn with_department(mut self, name: impl Into<String>, config: DepartmentConfig) -> Self {
        self.extra.push((name.into(), config));
        self
    }

    /// Report to these sinks instead of `tracing`.
    #[must_use]
    pub fn with_sinks(mut self, sinks: Sinks) -> Self {
        self.sinks = sinks;
        self
    }

    /// Persist task reports here instead of an in-memory store.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replace the default [`ThresholdReview`].
    #[must_use]
    pub fn with_review_policy(mut self, review: Arc<dyn ReviewPolicy>) -> Self {
        self.review = Some(review);
        self
    }

    /// Validate and assemble a stopped agency.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::DuplicateDepartment`] if an added name is taken, or
    /// [`SchedulerError::InvalidConfig`] if validation fails.
    pub fn build(self) -> Result<Agency, SchedulerError> {
        let Self {
            mut config,
            extra,
            sinks,
            store,
            review,
        } = self;
        for (name, dept) in extra {
            if config.departments.contains_key(&name) {
                return Err(SchedulerError::DuplicateDepartment(name));
            }
            config.departments.insert(name, dept);
        }

        let store = store.unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let departments = build_departments(&config, &sinks, &store)?;
        let review =
            review.unwrap_or_else(|| Arc::new(ThresholdReview::new(config.orchestration.max_workers)));
        let governance = Governance::new(
            &departments,
            config.governance.clone(),
            review,
            Arc::clone(&sinks.log),
        );
        tracing::info!(
            departments = departments.len(),
            max_workers = config.orchestration.max_workers,
            queue_size = config.orchestration.queue_size,
            "agency built"
        );
        Ok(Agency::from_parts(
            config,
            departments,
            Arc::new(governance),
            sinks,
            store,
        ))
    }
}
