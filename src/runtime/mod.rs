//! The agency root and its API surface.

pub mod agency;
pub mod api;

pub use agency::Agency;
pub use api::{health, submit_task, task_status, Health, TaskStatusResponse, TaskSubmission};
