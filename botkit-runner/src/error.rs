//! Runner error taxonomy
//!
//! Only `InvalidModeError` and `AuthenticationError` can stop a run before
//! the task body starts. Task-body errors are converted into a log record
//! and an exit code at the runner boundary. Sampling and notification
//! errors are logged and never abort the run.

use botkit_client::ClientError;
use std::path::PathBuf;
use thiserror::Error;

pub use botkit_core::domain::run::InvalidModeError;

/// Login to the orchestration service failed or could not be attempted
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("orchestrator credentials not configured (missing {0})")]
    MissingCredentials(&'static str),

    #[error("orchestrator rejected login: {0}")]
    Rejected(#[source] ClientError),
}

impl From<ClientError> for AuthenticationError {
    fn from(err: ClientError) -> Self {
        AuthenticationError::Rejected(err)
    }
}

/// The task body returned an error or panicked on its last attempt
#[derive(Debug, Clone, Error)]
#[error("task body failed after {attempts} attempt(s): {message}")]
pub struct TaskExecutionError {
    /// Top-level error message
    pub message: String,
    /// Full error chain (or panic payload)
    pub trace: String,
    pub attempts: u32,
}

/// A resource reading could not be taken; the sample is degraded instead
#[derive(Debug, Error)]
pub enum ResourceSamplingError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {what}: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("no GPU statistics available: {0}")]
    GpuUnavailable(String),
}

/// An alert could not be delivered
#[derive(Debug, Error)]
#[error("notification delivery failed: {0}")]
pub struct NotificationDeliveryError(#[from] pub ClientError);

/// Configuration could not be loaded or is inconsistent
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },

    #[error("{0}")]
    Invalid(String),
}
