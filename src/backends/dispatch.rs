//! # Dispatch Orchestration
//!
//! Every backend shares one enqueue skeleton: validate, resolve the effective
//! destination, serialize the payload, publish, and fold the outcome into a
//! [`TaskResult`]. [`CloudBackend`] implements that skeleton once and delegates
//! the transport-specific step to a [`Publisher`].
//!
//! ## Failure routing
//!
//! A publisher reports a [`PublishError`]:
//!
//! - `Transport` failures (network, throttling, permissions, missing resources
//!   during publish) are captured into the returned record as a [`TaskError`]
//!   and the record is marked `FAILED`.
//! - `Dispatch` failures (destination resolution, configuration) propagate out
//!   of `enqueue` unchanged.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::TaskBackend;
use crate::config::BackendKind;
use crate::error::{DispatchError, DispatchResult};
use crate::logging::{log_backend_operation, log_dispatch_operation};
use crate::messaging::errors::{TransportError, TransportResult};
use crate::models::{TaskError, TaskInvocation, TaskResult};
use crate::validation::TaskValidator;

/// Capability flags advertised by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    pub supports_defer: bool,
    pub supports_get_result: bool,
}

/// One message ready for the transport
#[derive(Debug, Clone, Copy)]
pub struct OutboundMessage<'a> {
    pub destination: &'a str,
    pub task_name: &'a str,
    pub run_after: Option<DateTime<Utc>>,
    /// Serialized `{task, args, kwargs}` payload
    pub body: &'a str,
}

#[derive(Debug)]
pub enum PublishError {
    Transport(TransportError),
    Dispatch(DispatchError),
}

impl From<TransportError> for PublishError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<DispatchError> for PublishError {
    fn from(err: DispatchError) -> Self {
        Self::Dispatch(err)
    }
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "{err}"),
            Self::Dispatch(err) => write!(f, "{err}"),
        }
    }
}

/// Transport-specific publish capability
#[async_trait]
pub trait Publisher: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn capabilities(&self) -> BackendCapabilities;

    /// Publish one message; returns the identifier to record, if any
    async fn publish(&self, message: &OutboundMessage<'_>) -> Result<Option<String>, PublishError>;

    /// Release cached handles and the underlying client
    async fn close(&self) -> TransportResult<()>;
}

/// Normalize a captured transport failure into a backend-agnostic descriptor
///
/// The class path names the error type and variant; the traceback is the full
/// error chain, including every `Caused by:` entry.
pub fn task_error_from(err: TransportError) -> TaskError {
    let exception_class_path = err.class_path();
    let traceback = format!("{:?}", anyhow::Error::new(err));
    TaskError::new(exception_class_path, traceback)
}

/// Generic backend: shared enqueue orchestration over a [`Publisher`]
pub struct CloudBackend<P> {
    alias: String,
    default_destination: String,
    validator: TaskValidator,
    publisher: P,
    closed: AtomicBool,
}

impl<P: Publisher> CloudBackend<P> {
    pub fn new(
        alias: impl Into<String>,
        default_destination: impl Into<String>,
        allowed_destinations: &[String],
        publisher: P,
    ) -> Self {
        let validator = TaskValidator::new(publisher.capabilities().supports_defer)
            .with_allowed_destinations(allowed_destinations.iter().cloned());
        let backend = Self {
            alias: alias.into(),
            default_destination: default_destination.into(),
            validator,
            publisher,
            closed: AtomicBool::new(false),
        };
        log_backend_operation(
            "initialize",
            &backend.alias,
            backend.publisher.kind(),
            Some(backend.default_destination.as_str()),
        );
        backend
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

impl<P: Publisher> fmt::Debug for CloudBackend<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudBackend")
            .field("alias", &self.alias)
            .field("kind", &self.publisher.kind())
            .field("default_destination", &self.default_destination)
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}

#[async_trait]
impl<P: Publisher> TaskBackend for CloudBackend<P> {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn kind(&self) -> BackendKind {
        self.publisher.kind()
    }

    fn default_destination(&self) -> &str {
        &self.default_destination
    }

    fn supports_defer(&self) -> bool {
        self.publisher.capabilities().supports_defer
    }

    fn supports_get_result(&self) -> bool {
        self.publisher.capabilities().supports_get_result
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn enqueue(&self, invocation: &TaskInvocation) -> DispatchResult<TaskResult> {
        if self.is_closed() {
            return Err(DispatchError::backend_closed(&self.alias));
        }

        let destination = invocation.effective_destination(&self.default_destination);
        self.validator.validate(invocation, destination)?;

        let body = invocation.payload().to_json()?;
        let result = TaskResult::ready(
            invocation.name(),
            invocation.args().to_vec(),
            invocation.kwargs().clone(),
            &self.alias,
        );

        debug!(
            alias = %self.alias,
            destination = %destination,
            task_name = %invocation.name(),
            "Publishing task"
        );

        let message = OutboundMessage {
            destination,
            task_name: invocation.name(),
            run_after: invocation.run_after(),
            body: &body,
        };

        let started = Instant::now();
        let outcome = self.publisher.publish(&message).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(id) => {
                let result = result.enqueued(id, Utc::now());
                info!(
                    alias = %self.alias,
                    destination = %destination,
                    message_id = ?result.id(),
                    "✅ Task enqueued"
                );
                result
            }
            Err(PublishError::Transport(err)) => {
                warn!(
                    alias = %self.alias,
                    destination = %destination,
                    error = %err,
                    "❌ Task publish failed"
                );
                result.failed(task_error_from(err))
            }
            Err(PublishError::Dispatch(err)) => return Err(err),
        };

        log_dispatch_operation(
            &self.alias,
            self.publisher.kind(),
            destination,
            invocation.name(),
            result.status(),
            result.id(),
            duration_ms,
        );
        Ok(result)
    }

    async fn close(&self) -> DispatchResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let outcome = self.publisher.close().await;
        log_backend_operation("close", &self.alias, self.publisher.kind(), None);
        outcome.map_err(|err| {
            warn!(alias = %self.alias, error = %err, "Error while closing backend transport");
            DispatchError::close_failed(&self.alias, err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskResultStatus;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<(String, String)>>,
        fail_with: Mutex<Option<fn() -> PublishError>>,
        fail_close: AtomicBool,
        closes: AtomicUsize,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        fn kind(&self) -> BackendKind {
            BackendKind::Sqs
        }

        fn capabilities(&self) -> BackendCapabilities {
            BackendCapabilities {
                supports_defer: false,
                supports_get_result: true,
            }
        }

        async fn publish(
            &self,
            message: &OutboundMessage<'_>,
        ) -> Result<Option<String>, PublishError> {
            if let Some(make_error) = *self.fail_with.lock() {
                return Err(make_error());
            }
            self.sent
                .lock()
                .push((message.destination.to_string(), message.body.to_string()));
            Ok(Some("m-1".to_string()))
        }

        async fn close(&self) -> TransportResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(TransportError::network("Close", "connection reset"));
            }
            Ok(())
        }
    }

    fn throttled() -> PublishError {
        TransportError::throttled("SendMessage").into()
    }

    fn unresolved() -> PublishError {
        DispatchError::destination_resolution("sqs", "orders", "queue missing").into()
    }

    fn backend() -> CloudBackend<RecordingPublisher> {
        CloudBackend::new("default", "orders", &[], RecordingPublisher::default())
    }

    #[tokio::test]
    async fn test_successful_publish_sets_dispatch_facts() {
        let backend = backend();
        let result = backend
            .enqueue(&TaskInvocation::new("ship").with_arg(7))
            .await
            .unwrap();

        assert_eq!(result.status(), TaskResultStatus::Ready);
        assert_eq!(result.id(), Some("m-1"));
        assert!(result.enqueued_at().is_some());
        assert_eq!(result.backend(), "default");

        let sent = backend.publisher().sent.lock().clone();
        assert_eq!(
            sent,
            vec![(
                "orders".to_string(),
                r#"{"task":"ship","args":[7],"kwargs":{}}"#.to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_captured() {
        let backend = backend();
        *backend.publisher().fail_with.lock() = Some(throttled);

        let result = backend.enqueue(&TaskInvocation::new("ship")).await.unwrap();

        assert_eq!(result.status(), TaskResultStatus::Failed);
        assert_eq!(result.id(), None);
        assert!(result.enqueued_at().is_none());
        assert_eq!(result.errors().len(), 1);
        assert_eq!(
            result.errors()[0].exception_class_path,
            "tasks_cloud::messaging::errors::TransportError::Throttled"
        );
        assert!(result.errors()[0].traceback.contains("SendMessage"));
    }

    #[tokio::test]
    async fn test_dispatch_failure_propagates() {
        let backend = backend();
        *backend.publisher().fail_with.lock() = Some(unresolved);

        let err = backend
            .enqueue(&TaskInvocation::new("ship"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::DestinationResolution { .. }));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_enqueue() {
        let backend = backend();
        backend.close().await.unwrap();
        backend.close().await.unwrap();

        assert!(backend.is_closed());
        assert_eq!(backend.publisher().closes.load(Ordering::SeqCst), 1);

        let err = backend
            .enqueue(&TaskInvocation::new("ship"))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::BackendClosed { .. }));
    }

    #[tokio::test]
    async fn test_close_failure_is_reported_once() {
        let backend = backend();
        backend.publisher().fail_close.store(true, Ordering::SeqCst);

        let err = backend.close().await.unwrap_err();
        assert!(matches!(err, DispatchError::CloseFailed { .. }));
        assert!(err.to_string().contains("default"));
        assert!(backend.is_closed());

        backend.close().await.unwrap();
        assert_eq!(backend.publisher().closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_task_error_traceback_includes_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let error = task_error_from(TransportError::service("Publish", io));

        assert_eq!(
            error.exception_class_path,
            "tasks_cloud::messaging::errors::TransportError::Service"
        );
        assert!(error.traceback.contains("Service error during Publish"));
        assert!(error.traceback.contains("Caused by:"));
        assert!(error.traceback.contains("reset by peer"));
    }
}
