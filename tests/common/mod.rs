//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agency_runtime::config::{
    AgencyConfig, DepartmentConfig, GovernanceConfig, LoggingConfig, OrchestrationConfig,
};
use agency_runtime::core::{
    Capability, CapabilityError, InMemoryAlertSink, InMemoryLogSink, InMemoryMetricsSink,
    OptionSchema, Provider, ProviderOptions, Sinks,
};
use agency_runtime::Agency;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};

pub const DEPT: &str = "engineering";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// One department, governance off, fast retries.
pub fn agency_config(department: DepartmentConfig, queue_size: usize) -> AgencyConfig {
    let mut departments = BTreeMap::new();
    departments.insert(DEPT.to_string(), department);
    AgencyConfig {
        departments,
        orchestration: OrchestrationConfig {
            max_workers: 16,
            pipeline_timeout: 5.0,
            retry_delay: 0.01,
            queue_size,
            max_retries: 3,
        },
        governance: GovernanceConfig {
            enabled: false,
            ..GovernanceConfig::default()
        },
        logging: LoggingConfig::default(),
    }
}

pub fn department(max_concurrent_tasks: usize) -> DepartmentConfig {
    DepartmentConfig {
        max_concurrent_tasks,
        ..DepartmentConfig::default()
    }
}

pub struct Recorded {
    pub logs: Arc<InMemoryLogSink>,
    pub metrics: Arc<InMemoryMetricsSink>,
    pub alerts: Arc<InMemoryAlertSink>,
}

impl Recorded {
    pub fn new() -> Self {
        Self {
            logs: Arc::new(InMemoryLogSink::new(1024)),
            metrics: Arc::new(InMemoryMetricsSink::new(1024)),
            alerts: Arc::new(InMemoryAlertSink::new(1024)),
        }
    }

    pub fn sinks(&self) -> Sinks {
        Sinks {
            log: self.logs.clone(),
            metrics: self.metrics.clone(),
            alerts: self.alerts.clone(),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.logs.events().into_iter().map(|e| e.message).collect()
    }
}

pub fn build_agency(config: AgencyConfig, recorded: &Recorded) -> Agency {
    Agency::builder(config)
        .with_sinks(recorded.sinks())
        .build()
        .unwrap()
}

pub fn options(pairs: &[(&str, &str)]) -> ProviderOptions {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), Value::from(*v)))
        .collect()
}

/// A provider with an empty option schema, already configured.
pub fn configured(name: &str, capability: impl Capability) -> Provider {
    let provider = Provider::new(name, capability);
    provider.configure(ProviderOptions::new()).unwrap();
    provider
}

pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ============================================================================
// TEST CAPABILITIES - Real implementations for testing
// ============================================================================

/// Returns its payload.
pub struct Echo {
    pub kind: &'static str,
}

#[async_trait]
impl Capability for Echo {
    fn kind(&self) -> &str {
        self.kind
    }

    fn schema(&self) -> OptionSchema {
        OptionSchema::new()
    }

    async fn invoke(&self, _config: &ProviderOptions, payload: Value) -> Result<Value, CapabilityError> {
        Ok(payload)
    }
}

/// Records each payload on entry, then waits for a gate permit.
pub struct Gated {
    pub kind: &'static str,
    pub gate: Arc<Semaphore>,
    pub seen: Arc<Mutex<Vec<Value>>>,
}

impl Gated {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            gate: Arc::new(Semaphore::new(0)),
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Capability for Gated {
    fn kind(&self) -> &str {
        self.kind
    }

    fn schema(&self) -> OptionSchema {
        OptionSchema::new()
    }

    async fn invoke(&self, _config: &ProviderOptions, payload: Value) -> Result<Value, CapabilityError> {
        self.seen.lock().await.push(payload.clone());
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| CapabilityError::Permanent(e.to_string()))?;
        permit.forget();
        Ok(payload)
    }
}

/// Fails `failures` times, then succeeds.
pub struct Flaky {
    pub kind: &'static str,
    pub failures: u32,
    pub permanent: bool,
    pub calls: Arc<AtomicU32>,
}

impl Flaky {
    pub fn transient(kind: &'static str, failures: u32) -> Self {
        Self {
            kind,
            failures,
            permanent: false,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn permanent(kind: &'static str) -> Self {
        Self {
            kind,
            failures: u32::MAX,
            permanent: true,
            calls: Arc::new(AtomicU32::new(0)),
        }
    }
}

#[async_trait]
impl Capability for Flaky {
    fn kind(&self) -> &str {
        self.kind
    }

    fn schema(&self) -> OptionSchema {
        OptionSchema::new()
    }

    async fn invoke(&self, _config: &ProviderOptions, payload: Value) -> Result<Value, CapabilityError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(if self.permanent {
                CapabilityError::Permanent(format!("rejected call {call}"))
            } else {
                CapabilityError::Transient(format!("flaky call {call}"))
            });
        }
        Ok(payload)
    }
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Never returns; flags when its call is dropped.
pub struct Hanging {
    pub kind: &'static str,
    pub dropped: Arc<AtomicBool>,
}

impl Hanging {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            dropped: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl Capability for Hanging {
    fn kind(&self) -> &str {
        self.kind
    }

    fn schema(&self) -> OptionSchema {
        OptionSchema::new()
    }

    async fn invoke(&self, _config: &ProviderOptions, _payload: Value) -> Result<Value, CapabilityError> {
        let _guard = DropFlag(Arc::clone(&self.dropped));
        std::future::pending::<()>().await;
        Ok(Value::Null)
    }
}
