//! Configuration models for departments, orchestration, governance and logging.

pub mod agency;

pub use agency::{
    AgencyConfig, DepartmentConfig, GovernanceConfig, LoggingConfig, OrchestrationConfig,
    CONFIG_PATH_ENV,
};
