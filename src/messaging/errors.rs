//! # Transport Error Types
//!
//! Failures reported by transport collaborators (queue, topic, scheduler,
//! function and service bus clients). Adapters translate their SDK errors into
//! one of these variants, keeping the original error as `source` when there is one.

use thiserror::Error;

/// Boxed SDK error carried as the source of a [`TransportError::Service`]
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network error during {operation}: {message}")]
    Network { operation: String, message: String },

    #[error("Network timeout: operation {operation} timed out after {timeout_seconds}s")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    #[error("Request throttled during {operation}")]
    Throttled { operation: String },

    #[error("Access denied during {operation}: {message}")]
    AccessDenied { operation: String, message: String },

    #[error("Resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Service error during {operation}: {source}")]
    Service {
        operation: String,
        #[source]
        source: BoxError,
    },
}

impl TransportError {
    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    pub fn throttled(operation: impl Into<String>) -> Self {
        Self::Throttled {
            operation: operation.into(),
        }
    }

    pub fn access_denied(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::AccessDenied {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn service(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Service {
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::Network { .. } => "Network",
            Self::Timeout { .. } => "Timeout",
            Self::Throttled { .. } => "Throttled",
            Self::AccessDenied { .. } => "AccessDenied",
            Self::NotFound { .. } => "NotFound",
            Self::Service { .. } => "Service",
        }
    }

    /// Qualified type path of this failure, e.g.
    /// `tasks_cloud::messaging::errors::TransportError::Throttled`
    pub fn class_path(&self) -> String {
        format!(
            "{}::{}",
            std::any::type_name::<Self>(),
            self.variant_name()
        )
    }

    /// Throttling, timeouts and network failures may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::Timeout { .. } | Self::Throttled { .. }
        )
    }
}

/// Result type alias for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_class_path_names_variant() {
        let err = TransportError::throttled("SendMessage");
        assert_eq!(
            err.class_path(),
            "tasks_cloud::messaging::errors::TransportError::Throttled"
        );
    }

    #[test]
    fn test_service_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = TransportError::service("Publish", io);

        assert!(err.to_string().contains("Publish"));
        let source = err.source().expect("source retained");
        assert_eq!(source.to_string(), "reset by peer");
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(TransportError::timeout("Invoke", 5).is_transient());
        assert!(TransportError::network("Invoke", "dns").is_transient());
        assert!(!TransportError::not_found("queue/x").is_transient());
        assert!(!TransportError::access_denied("Invoke", "no").is_transient());
    }
}
