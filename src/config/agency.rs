//! Agency configuration structures.
//!
//! Loaded once when an [`Agency`](crate::Agency) is built; afterwards only the
//! governance loop changes department policy. Intervals and timeouts are
//! given in (fractional) seconds.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file used by [`AgencyConfig::from_env`].
pub const CONFIG_PATH_ENV: &str = "AGENCY_CONFIG";

/// Department-specific configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DepartmentConfig {
    /// Minimum acceptable success ratio.
    pub evaluation_threshold: f64,
    /// Number of recent terminal outcomes in the rolling window.
    pub performance_window: usize,
    /// Concurrency cap.
    pub max_concurrent_tasks: usize,
    /// Whether work in this department is subject to review.
    pub code_review_required: bool,
    /// Utilization at which dispatch pauses and admission may be refused.
    pub resource_utilization_threshold: f64,
    /// Seconds between metrics ticks.
    pub metrics_update_interval: f64,
    /// Utilization at which an alert fires.
    pub alert_threshold: f64,
}

impl Default for DepartmentConfig {
    fn default() -> Self {
        Self {
            evaluation_threshold: 0.8,
            performance_window: 10,
            max_concurrent_tasks: 5,
            code_review_required: true,
            resource_utilization_threshold: 0.8,
            metrics_update_interval: 300.0,
            alert_threshold: 0.7,
        }
    }
}

/// Task orchestration configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestrationConfig {
    /// Ceiling the governance review may raise a department cap to.
    pub max_workers: usize,
    /// Default per-attempt task timeout (seconds).
    pub pipeline_timeout: f64,
    /// Default flat retry delay (seconds).
    pub retry_delay: f64,
    /// Queue capacity of each department.
    pub queue_size: usize,
    /// Default retry budget.
    pub max_retries: u32,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            pipeline_timeout: 600.0,
            retry_delay: 5.0,
            queue_size: 100,
            max_retries: 3,
        }
    }
}

/// Governance loop configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GovernanceConfig {
    /// Whether `Agency::start` runs the governance loop.
    pub enabled: bool,
    /// Seconds between department performance reviews.
    pub performance_review_interval: f64,
    /// Seconds between provider health re-evaluations.
    pub capability_update_interval: f64,
    /// Seconds between reinstatements of demoted providers.
    pub role_rotation_interval: f64,
    /// Failure ratio at which a provider is demoted to passive.
    pub failure_ratio_limit: f64,
    /// Minimum recorded operations before a provider can be demoted.
    pub min_operations: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            performance_review_interval: 3600.0,
            capability_update_interval: 86_400.0,
            role_rotation_interval: 604_800.0,
            failure_ratio_limit: 0.5,
            min_operations: 4,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
        }
    }
}

/// Root agency configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgencyConfig {
    /// Map of department name to configuration.
    pub departments: BTreeMap<String, DepartmentConfig>,
    /// Scheduler settings shared by all departments.
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    /// Governance loop settings.
    #[serde(default)]
    pub governance: GovernanceConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AgencyConfig {
    /// The stock organisation: `sr`, `engineering`, `operations`, `analytics`.
    fn default() -> Self {
        let departments = ["sr", "engineering", "operations", "analytics"]
            .into_iter()
            .map(|name| (name.to_owned(), DepartmentConfig::default()))
            .collect();
        Self {
            departments,
            orchestration: OrchestrationConfig::default(),
            governance: GovernanceConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn check_unit(value: f64, name: &str) -> Result<(), String> {
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{name} must be between 0 and 1, got {value}"));
    }
    Ok(())
}

fn check_seconds(value: f64, name: &str) -> Result<(), String> {
    match Duration::try_from_secs_f64(value) {
        Ok(d) if !d.is_zero() => Ok(()),
        _ => Err(format!("{name} must be a positive number of seconds, got {value}")),
    }
}

/// Converts validated seconds; out-of-range input saturates instead of panicking.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

impl DepartmentConfig {
    /// Validate department configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        check_unit(self.evaluation_threshold, "evaluation_threshold")?;
        if self.performance_window == 0 {
            return Err("performance_window must be greater than 0".into());
        }
        if self.max_concurrent_tasks == 0 {
            return Err("max_concurrent_tasks must be greater than 0".into());
        }
        check_unit(self.resource_utilization_threshold, "resource_utilization_threshold")?;
        // A zero threshold would keep dispatch paused forever.
        if self.resource_utilization_threshold == 0.0 {
            return Err("resource_utilization_threshold must be greater than 0".into());
        }
        check_seconds(self.metrics_update_interval, "metrics_update_interval")?;
        check_unit(self.alert_threshold, "alert_threshold")?;
        Ok(())
    }

    /// Interval between metrics ticks.
    #[must_use]
    pub fn metrics_interval(&self) -> Duration {
        seconds(self.metrics_update_interval)
    }
}

impl OrchestrationConfig {
    /// Validate orchestration configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be greater than 0".into());
        }
        check_seconds(self.pipeline_timeout, "pipeline_timeout")?;
        if Duration::try_from_secs_f64(self.retry_delay).is_err() {
            return Err(format!(
                "retry_delay must be a non-negative number of seconds, got {}",
                self.retry_delay
            ));
        }
        if self.queue_size == 0 {
            return Err("queue_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Default task timeout.
    #[must_use]
    pub fn task_timeout(&self) -> Duration {
        seconds(self.pipeline_timeout)
    }

    /// Default retry delay.
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        seconds(self.retry_delay)
    }
}

impl GovernanceConfig {
    /// Validate governance configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        check_seconds(self.performance_review_interval, "performance_review_interval")?;
        check_seconds(self.capability_update_interval, "capability_update_interval")?;
        check_seconds(self.role_rotation_interval, "role_rotation_interval")?;
        check_unit(self.failure_ratio_limit, "failure_ratio_limit")?;
        if self.min_operations == 0 {
            return Err("min_operations must be greater than 0".into());
        }
        Ok(())
    }

    /// Performance review period.
    #[must_use]
    pub fn review_interval(&self) -> Duration {
        seconds(self.performance_review_interval)
    }

    /// Capability update period.
    #[must_use]
    pub fn capability_interval(&self) -> Duration {
        seconds(self.capability_update_interval)
    }

    /// Role rotation period.
    #[must_use]
    pub fn rotation_interval(&self) -> Duration {
        seconds(self.role_rotation_interval)
    }
}

impl LoggingConfig {
    /// Validate the level directive.
    ///
    /// # Errors
    ///
    /// Returns a message if the level is not a known tracing level.
    pub fn validate(&self) -> Result<(), String> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(format!(
                "log level must be one of {LEVELS:?}, got {}",
                self.level
            ));
        }
        Ok(())
    }
}

impl AgencyConfig {
    /// Validate all sections and ensure at least one department exists.
    ///
    /// # Errors
    ///
    /// Returns a message naming the section and field that failed.
    pub fn validate(&self) -> Result<(), String> {
        if self.departments.is_empty() {
            return Err("at least one department must be defined".into());
        }
        for (name, dept) in &self.departments {
            if name.trim().is_empty() {
                return Err("department names must not be empty".into());
            }
            dept.validate()
                .map_err(|e| format!("department `{name}` invalid: {e}"))?;
        }
        self.orchestration
            .validate()
            .map_err(|e| format!("orchestration invalid: {e}"))?;
        self.governance
            .validate()
            .map_err(|e| format!("governance invalid: {e}"))?;
        self.logging
            .validate()
            .map_err(|e| format!("logging invalid: {e}"))?;
        Ok(())
    }

    /// Parse agency configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation message.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an I/O, parse or validation message.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// Load the file named by `AGENCY_CONFIG`, after loading `.env` if present.
    ///
    /// # Errors
    ///
    /// Returns a message if the variable is unset or the file is invalid.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        let path = std::env::var(CONFIG_PATH_ENV)
            .map_err(|_| format!("{CONFIG_PATH_ENV} is not set"))?;
        Self::from_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = AgencyConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.departments.len(), 4);
        assert!(cfg.departments.contains_key("engineering"));
    }

    #[test]
    fn test_zero_utilization_threshold_rejected() {
        let dept = DepartmentConfig {
            resource_utilization_threshold: 0.0,
            ..DepartmentConfig::default()
        };
        assert!(dept.validate().is_err());
    }

    #[test]
    fn test_fractional_intervals() {
        let dept = DepartmentConfig {
            metrics_update_interval: 0.05,
            ..DepartmentConfig::default()
        };
        assert!(dept.validate().is_ok());
        assert_eq!(dept.metrics_interval(), Duration::from_millis(50));
    }
}
