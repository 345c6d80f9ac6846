//! Governance loop: periodic performance review, capability update and role
//! rotation over the departments of one agency.
//!
//! The loop only reads published snapshots and swaps whole policies; it never
//! touches queued or running tasks.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::GovernanceConfig;
use crate::core::department::{Department, DepartmentPolicy};
use crate::core::events::{LogEvent, LogLevel, LogSink};
use crate::core::monitor::MetricsSnapshot;
use crate::core::provider::ProviderMode;
use crate::util::shutdown::stopped;

/// Phase of the governance state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GovernanceState {
    /// Waiting for the next period.
    Idle,
    /// Reading snapshots and computing proposals.
    Reviewing,
    /// Swapping a department policy.
    Applying,
}

/// Strategy deciding policy changes from a department snapshot.
pub trait ReviewPolicy: Send + Sync {
    /// Propose a replacement for `current`, or `None` to keep it.
    ///
    /// `baseline` is the policy the department was configured with.
    fn review(
        &self,
        snapshot: &MetricsSnapshot,
        current: &DepartmentPolicy,
        baseline: &DepartmentPolicy,
    ) -> Option<DepartmentPolicy>;
}

/// Default review: shrink the concurrency cap of a failing department,
/// grow it for a healthy saturated one.
///
/// The cap moves by one per review, never below 1 and never above the
/// larger of the configured cap and `max_workers`.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdReview {
    max_workers: usize,
}

impl ThresholdReview {
    /// Review bounded by the orchestration worker count.
    #[must_use]
    pub const fn new(max_workers: usize) -> Self {
        Self { max_workers }
    }
}

impl ReviewPolicy for ThresholdReview {
    fn review(
        &self,
        snapshot: &MetricsSnapshot,
        current: &DepartmentPolicy,
        baseline: &DepartmentPolicy,
    ) -> Option<DepartmentPolicy> {
        let failing = snapshot.window_full() && snapshot.success_ratio < current.evaluation_threshold;
        let ceiling = baseline.max_concurrent_tasks.max(self.max_workers);
        let next_cap = if failing {
            current.max_concurrent_tasks.saturating_sub(1).max(1)
        } else if snapshot.utilization >= current.alert_threshold
            && snapshot.success_ratio >= current.evaluation_threshold
        {
            (current.max_concurrent_tasks + 1).min(ceiling)
        } else {
            return None;
        };
        (next_cap != current.max_concurrent_tasks).then(|| DepartmentPolicy {
            max_concurrent_tasks: next_cap,
            ..current.clone()
        })
    }
}

/// Control-plane actor over an agency's departments.
pub struct Governance {
    departments: Vec<(Arc<Department>, DepartmentPolicy)>,
    config: GovernanceConfig,
    review: Arc<dyn ReviewPolicy>,
    state: RwLock<GovernanceState>,
    log: Arc<dyn LogSink>,
}

impl std::fmt::Debug for Governance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Governance")
            .field("departments", &self.departments.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Governance {
    /// Govern `departments`; their current policies become the baselines.
    pub fn new(
        departments: &BTreeMap<String, Arc<Department>>,
        config: GovernanceConfig,
        review: Arc<dyn ReviewPolicy>,
        log: Arc<dyn LogSink>,
    ) -> Self {
        let departments = departments
            .values()
            .map(|d| (Arc::clone(d), (*d.policy()).clone()))
            .collect();
        Self {
            departments,
            config,
            review,
            state: RwLock::new(GovernanceState::Idle),
            log,
        }
    }

    /// Current phase.
    #[must_use]
    pub fn state(&self) -> GovernanceState {
        *self.state.read()
    }

    fn enter(&self, state: GovernanceState) {
        *self.state.write() = state;
    }

    fn event(&self, level: LogLevel, message: &str) -> LogEvent {
        LogEvent::new(level, "governance", message)
    }

    /// Review every department once. Returns how many policies were swapped.
    pub fn run_review_cycle(&self) -> usize {
        let mut applied = 0;
        for (department, baseline) in &self.departments {
            self.enter(GovernanceState::Reviewing);
            let snapshot = department.published().unwrap_or_else(|| department.snapshot());
            let current = department.policy();
            let Some(proposal) = self.review.review(&snapshot, &current, baseline) else {
                continue;
            };
            self.enter(GovernanceState::Applying);
            let cap = proposal.max_concurrent_tasks;
            match department.swap_policy(proposal) {
                Ok(previous) => {
                    applied += 1;
                    self.log.log(
                        self.event(LogLevel::Info, "department policy adjusted")
                            .with("department", department.name())
                            .with("from", previous.max_concurrent_tasks)
                            .with("to", cap)
                            .with("success_ratio", snapshot.success_ratio)
                            .with("utilization", snapshot.utilization),
                    );
                }
                Err(err) => self.log.log(
                    self.event(LogLevel::Error, "policy proposal rejected")
                        .with("department", department.name())
                        .with("error", err.to_string()),
                ),
            }
        }
        self.enter(GovernanceState::Idle);
        applied
    }

    /// Demote providers whose recorded failure ratio reached the limit.
    /// Returns how many were demoted.
    #[allow(clippy::cast_precision_loss)]
    pub fn run_capability_cycle(&self) -> usize {
        let mut demoted = 0;
        for (department, _) in &self.departments {
            for provider in department.providers() {
                if provider.mode() == ProviderMode::Passive {
                    continue;
                }
                let (finished, failed) = provider.outcome_counts();
                if finished < self.config.min_operations {
                    continue;
                }
                let ratio = failed as f64 / finished as f64;
                if ratio >= self.config.failure_ratio_limit {
                    provider.set_mode(ProviderMode::Passive);
                    demoted += 1;
                    self.log.log(
                        self.event(LogLevel::Warn, "provider demoted")
                            .with("department", department.name())
                            .with("provider", provider.name())
                            .with("failure_ratio", ratio),
                    );
                }
            }
        }
        demoted
    }

    /// Reset idle passive providers back to their default mode.
    /// Returns how many were reinstated.
    pub fn run_rotation_cycle(&self) -> usize {
        let mut reinstated = 0;
        for (department, _) in &self.departments {
            for provider in department.providers() {
                if provider.mode() != ProviderMode::Passive
                    || provider.default_mode() == ProviderMode::Passive
                {
                    continue;
                }
                // Refused while a lease is still held; retried next rotation.
                if provider.reset().is_ok() {
                    reinstated += 1;
                    self.log.log(
                        self.event(LogLevel::Info, "provider reinstated")
                            .with("department", department.name())
                            .with("provider", provider.name())
                            .with("mode", provider.mode().to_string()),
                    );
                }
            }
        }
        reinstated
    }

    /// Run all three cycles on their periods until `shutdown` turns true.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut review = ticker(self.config.review_interval());
        let mut capability = ticker(self.config.capability_interval());
        let mut rotation = ticker(self.config.rotation_interval());
        // Skip the immediate first tick of each interval.
        review.tick().await;
        capability.tick().await;
        rotation.tick().await;
        tracing::info!(departments = self.departments.len(), "governance loop started");
        loop {
            tokio::select! {
                _ = review.tick() => {
                    self.run_review_cycle();
                }
                _ = capability.tick() => {
                    self.run_capability_cycle();
                }
                _ = rotation.tick() => {
                    self.run_rotation_cycle();
                }
                () = stopped(&mut shutdown) => break,
            }
        }
        tracing::info!("governance loop stopped");
    }
}

fn ticker(period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval(period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}
