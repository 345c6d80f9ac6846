//! Builders to construct departments and agencies from configuration.

pub mod agency_builder;

pub use agency_builder::{build_departments, AgencyBuilder};
