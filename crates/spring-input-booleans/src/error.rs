//! Error types for the spring reactor

use ha_event_bus::BusError;
use ha_service_registry::ServiceError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a host capability
#[derive(Debug, Clone, Error)]
pub enum HostError {
    #[error("cannot listen for events: {0}")]
    Listen(#[from] BusError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

/// Errors in the `spring_input_booleans` configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Errors that stop the reactor from being set up
#[derive(Debug, Error)]
pub enum SpringError {
    #[error("failed to register listener for '{event_type}': {source}")]
    Listen {
        event_type: String,
        #[source]
        source: HostError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}
