//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize tracing with defaults. Users can install their own subscriber;
/// this helper installs an env-based subscriber if none is set.
pub fn init_tracing() {
    init_tracing_with(&LoggingConfig::default());
}

/// Initialize tracing from logging configuration.
///
/// `RUST_LOG` wins over `config.level` when set. Does nothing if a global
/// subscriber is already installed.
pub fn init_tracing_with(config: &LoggingConfig) {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
