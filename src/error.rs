//! # Dispatch Error Types
//!
//! Crate-level errors that propagate out of backend construction and `enqueue`.
//! Transport failures during publish are not represented here: they are captured
//! into the returned [`TaskResult`](crate::models::TaskResult) instead.

use crate::config::ConfigurationError;
use crate::messaging::TransportError;
use crate::models::FrozenFieldError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Destination resolution failed: {backend}: '{destination}': {message}")]
    DestinationResolution {
        backend: String,
        destination: String,
        message: String,
    },

    #[error("Invalid task: {reason}")]
    InvalidTask { reason: String },

    #[error(transparent)]
    FrozenField(#[from] FrozenFieldError),

    #[error("Payload serialization error: {message}")]
    Serialization { message: String },

    #[error("No task backend configured for alias '{alias}'")]
    BackendNotFound { alias: String },

    #[error("Task backend '{alias}' has been closed")]
    BackendClosed { alias: String },

    #[error("Task backend '{alias}' failed to release its transport: {source}")]
    CloseFailed {
        alias: String,
        #[source]
        source: TransportError,
    },
}

impl DispatchError {
    /// Create a destination resolution error
    pub fn destination_resolution(
        backend: impl Into<String>,
        destination: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::DestinationResolution {
            backend: backend.into(),
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Create an invalid task error
    pub fn invalid_task(reason: impl Into<String>) -> Self {
        Self::InvalidTask {
            reason: reason.into(),
        }
    }

    /// Create a backend-not-found error
    pub fn backend_not_found(alias: impl Into<String>) -> Self {
        Self::BackendNotFound {
            alias: alias.into(),
        }
    }

    /// Create a backend-closed error
    pub fn backend_closed(alias: impl Into<String>) -> Self {
        Self::BackendClosed {
            alias: alias.into(),
        }
    }

    /// Create a close failure; the backend is closed regardless
    pub fn close_failed(alias: impl Into<String>, source: TransportError) -> Self {
        Self::CloseFailed {
            alias: alias.into(),
            source,
        }
    }

    /// True for errors caused by misconfiguration rather than by the caller's input
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::DestinationResolution { .. }
        )
    }
}

impl From<serde_json::Error> for DispatchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;
