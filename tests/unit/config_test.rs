//! Tests for configuration validation

use agency_runtime::config::{AgencyConfig, DepartmentConfig, GovernanceConfig, OrchestrationConfig};

#[test]
fn test_department_config_validation() {
    let valid = DepartmentConfig::default();
    assert!(valid.validate().is_ok());
}

#[test]
fn test_department_config_invalid_threshold() {
    let invalid = DepartmentConfig {
        evaluation_threshold: 1.5,
        ..DepartmentConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_department_config_invalid_window() {
    let invalid = DepartmentConfig {
        performance_window: 0,
        ..DepartmentConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_department_config_invalid_interval() {
    let invalid = DepartmentConfig {
        metrics_update_interval: 0.0,
        ..DepartmentConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_orchestration_config_invalid_queue_size() {
    let invalid = OrchestrationConfig {
        queue_size: 0,
        ..OrchestrationConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_agency_config_empty_departments() {
    let config = AgencyConfig {
        departments: std::collections::BTreeMap::new(),
        ..AgencyConfig::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_agency_config_from_json() {
    let json = r#"{
        "departments": {
            "engineering": {
                "max_concurrent_tasks": 2,
                "metrics_update_interval": 0.5
            }
        },
        "orchestration": {
            "max_workers": 4,
            "queue_size": 1
        },
        "logging": { "level": "debug", "json": true }
    }"#;

    let config = AgencyConfig::from_json_str(json).unwrap();
    let eng = &config.departments["engineering"];
    assert_eq!(eng.max_concurrent_tasks, 2);
    assert!((eng.evaluation_threshold - 0.8).abs() < f64::EPSILON);
    assert_eq!(config.orchestration.queue_size, 1);
    assert!((config.orchestration.pipeline_timeout - 600.0).abs() < f64::EPSILON);
    assert!(config.logging.json);
}

#[test]
fn test_agency_config_rejects_unknown_fields() {
    let json = r#"{ "departments": { "sr": { "max_concurent_tasks": 2 } } }"#;
    let err = AgencyConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("parse error"));
}

#[test]
fn test_agency_config_rejects_bad_log_level() {
    let json = r#"{ "departments": { "sr": {} }, "logging": { "level": "loud" } }"#;
    assert!(AgencyConfig::from_json_str(json).is_err());
}

#[test]
fn test_agency_config_from_missing_file() {
    let err = AgencyConfig::from_file("/nonexistent/agency.json").unwrap_err();
    assert!(err.contains("cannot read"));
}

#[test]
fn test_orchestration_config_oversized_durations_rejected() {
    let timeout = OrchestrationConfig {
        pipeline_timeout: 1e20,
        ..OrchestrationConfig::default()
    };
    let err = timeout.validate().unwrap_err();
    assert!(err.contains("pipeline_timeout"));

    let delay = OrchestrationConfig {
        retry_delay: 1e20,
        ..OrchestrationConfig::default()
    };
    assert!(delay.validate().unwrap_err().contains("retry_delay"));

    let config = AgencyConfig {
        orchestration: timeout,
        ..AgencyConfig::default()
    };
    assert!(config.validate().is_err());
    assert!(agency_runtime::Agency::new(config).is_err());
}

#[test]
fn test_oversized_intervals_rejected() {
    let dept = DepartmentConfig {
        metrics_update_interval: f64::MAX,
        ..DepartmentConfig::default()
    };
    assert!(dept.validate().is_err());
    // Unvalidated values saturate rather than panic.
    assert_eq!(dept.metrics_interval(), std::time::Duration::MAX);

    let governance = GovernanceConfig {
        role_rotation_interval: 1e20,
        ..GovernanceConfig::default()
    };
    assert!(governance.validate().is_err());
}

#[test]
fn test_default_max_workers_is_fixed() {
    assert_eq!(OrchestrationConfig::default().max_workers, 5);
}
