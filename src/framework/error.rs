//! # Framework Errors
//!
//! Error types shared by units, the configuration layer and the command boundary.
//! The orchestration taxonomy lives in [`OrchestrationError`]; everything a unit
//! hook can raise is a [`UnitError`].

use std::path::PathBuf;

/// Errors raised from inside a unit's lifecycle hooks.
#[derive(Debug, thiserror::Error)]
pub enum UnitError {
    #[error("enable failed: {0}")]
    Enable(String),
    #[error("disable failed: {0}")]
    Disable(String),
    #[error("reload failed: {0}")]
    Reload(String),
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("no async runtime available to schedule unit work")]
    NoRuntime,
    #[error("panicked: {0}")]
    Panicked(String),
    #[error("{0}")]
    Custom(String),
}

impl From<String> for UnitError {
    fn from(msg: String) -> Self {
        UnitError::Custom(msg)
    }
}

/// Errors produced while loading configuration or message files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("section '{path}' could not be decoded: {reason}")]
    Decode { path: String, reason: String },
    #[error("'{0}' is not a table")]
    NotATable(String),
}

/// Errors returned by command handlers.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("usage: {0}")]
    Usage(String),
    #[error("unknown command: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    Failed(String),
}

/// Failure taxonomy of the orchestrator.
///
/// Only [`OrchestrationError::RegistrationClosed`] is ever returned to a caller.
/// The other variants are built at the point of failure and rendered into the log,
/// because the registry always completes its walks.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum OrchestrationError {
    #[error("dependency '{dependency}' of '{unit}' not found")]
    MissingDependency { unit: String, dependency: String },
    #[error("cyclic dependency, units cannot be loaded: {}", .units.join(", "))]
    CyclicDependency { units: Vec<String> },
    #[error("failed to enable unit '{unit}': {reason}")]
    UnitEnableFailure { unit: String, reason: String },
    #[error("failed to disable unit '{unit}': {reason}")]
    UnitDisableFailure { unit: String, reason: String },
    #[error("failed to reload unit '{unit}': {reason}")]
    UnitReloadFailure { unit: String, reason: String },
    #[error("unit '{unit}' already registered, replacing it")]
    DuplicateRegistration { unit: String },
    #[error("cannot register unit '{unit}' after dependency resolution")]
    RegistrationClosed { unit: String },
}
