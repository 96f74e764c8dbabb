//! Error taxonomy for a monitoring run.
//!
//! Component-level failures (`SpawnError`, `ProbeError`) are captured into the
//! owning component and never interrupt monitoring of other components. Only an
//! `OrchestratorError` aborts the whole run.

use std::time::Duration;

use thiserror::Error;

/// A component process could not be launched.
///
/// Fatal to the owning component only: it is marked `failed` immediately.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpawnError {
    /// The executable does not exist or is not on `PATH`.
    #[error("Executable not found: {0}")]
    NotFound(String),

    /// The executable exists but cannot be run.
    #[error("Permission denied launching {0}")]
    PermissionDenied(String),

    /// Any other OS-level launch failure.
    #[error("Failed to spawn {command}: {message}")]
    Io { command: String, message: String },
}

impl SpawnError {
    /// Classify an `io::Error` returned by a spawn attempt.
    pub fn from_io(command: &str, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(command.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(command.to_string()),
            _ => Self::Io {
                command: command.to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// A single endpoint probe failed.
///
/// Never raised to callers: the probe runner records the message in
/// [`ProbeResult::error`](crate::domain::ProbeResult).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("Request timeout after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Unexpected status {0}")]
    Status(u16),

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("Body check failed: {0}")]
    Predicate(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Unexpected internal fault in the control loop. Aborts the run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrchestratorError {
    /// A spawned watcher or phase task panicked or was cancelled.
    #[error("Task failed: {0}")]
    TaskFailed(String),

    /// The update channel closed while updates were still expected.
    #[error("Update channel closed unexpectedly")]
    ChannelClosed,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Monitor configuration validation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Port must be between 1 and 65535, got {0}")]
    InvalidPort(u16),

    #[error("No components configured")]
    NoComponents,

    #[error("Component name cannot be empty")]
    EmptyComponentName,

    #[error("Duplicate component name: {0}")]
    DuplicateComponent(String),

    #[error("Component {0} has an empty command")]
    EmptyCommand(String),

    #[error("Component {component} has an invalid pattern {pattern:?}: {message}")]
    InvalidPattern {
        component: String,
        pattern: String,
        message: String,
    },

    #[error("Pattern rule for {0} must set exactly one of `contains` or `regex`")]
    AmbiguousPattern(String),

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("Poll interval ({interval_ms}ms) must not exceed startup timeout ({timeout_ms}ms)")]
    IntervalExceedsTimeout { interval_ms: u64, timeout_ms: u64 },

    #[error("Component {component} has an invalid endpoint URL: {url}")]
    InvalidEndpoint { component: String, url: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Core error type for semantic domain errors.
///
/// Adapters map this to their own error types (CLI exit codes).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A collaborator (validator, report writer) failed.
    #[error("External collaborator error: {0}")]
    External(String),
}
