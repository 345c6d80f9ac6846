//! # Agency Runtime
//!
//! An orchestration runtime for agent workloads: tasks are admitted into
//! per-department priority queues, dispatched to pluggable providers under
//! concurrency limits and deadlines, retried on transient failure, and
//! governed by a periodic control loop.
//!
//! ## Core Problem Solved
//!
//! Agent work arrives in bursts, runs for unpredictable time, and fails in
//! ways that are sometimes worth retrying and sometimes not:
//!
//! - **Bounded execution**: each department runs at most `max_concurrent_tasks`
//!   tasks and buffers at most `queue_size` more
//! - **Strict priority**: CRITICAL drains before HIGH, FIFO within a band
//! - **Hard deadlines**: a provider call that overruns is abandoned and its
//!   worker slot reused at once
//! - **Classified failures**: only timeouts and transient errors are retried
//!
//! ## Key Features
//!
//! - **Provider lifecycle**: validated configuration, PASSIVE/ACTIVE/ADAPTIVE
//!   modes, a bounded per-operation state log
//! - **Resource manager**: utilization, rolling success ratio, threshold alerts
//! - **Backpressure**: dispatch pauses at the utilization threshold while the
//!   queue keeps absorbing work
//! - **Governance**: periodic review swaps department policy without touching
//!   running work
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agency_runtime::config::AgencyConfig;
//! use agency_runtime::core::{CapabilityError, FnCapability, OptionSchema, Priority, Provider};
//! use agency_runtime::Agency;
//!
//! let agency = Agency::new(AgencyConfig::default())?;
//! let search = Provider::new(
//!     "search",
//!     FnCapability::new(
//!         "search",
//!         OptionSchema::new().required("api_key").required("model"),
//!         |_cfg, query| async move { Ok::<_, CapabilityError>(query) },
//!     ),
//! );
//! search.configure(options)?;
//! agency.register_provider("engineering", search)?;
//! agency.start().await;
//!
//! let task = agency.task("search", json!({"q": "rust"})).with_priority(Priority::High);
//! let output = agency.submit("engineering", task)?.outcome().await?;
//! agency.stop().await;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: tasks, providers, departments, governance.
pub mod core;
/// Configuration models for departments, orchestration, governance, logging.
pub mod config;
/// Builders to construct departments and agencies from configuration.
pub mod builders;
/// Infrastructure adapters for queues and storage.
pub mod infra;
/// The agency root and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::builders::AgencyBuilder;
pub use crate::config::AgencyConfig;
pub use crate::core::{SchedulerError, Task, TaskHandle};
pub use crate::runtime::Agency;
