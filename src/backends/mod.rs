//! # Task Backends
//!
//! A backend turns a [`TaskInvocation`] into exactly one transport publish and
//! reports the outcome as a [`TaskResult`]. All variants share the enqueue
//! orchestration in [`dispatch::CloudBackend`] and differ only in their
//! [`dispatch::Publisher`].
//!
//! | Kind | Publisher | Defer | Get result |
//! |---|---|---|---|
//! | `sqs` | [`sqs::SqsPublisher`] | no | yes |
//! | `sns` | [`sns::SnsPublisher`] | no | yes |
//! | `eventbridge_scheduler` | [`eventbridge::EventBridgePublisher`] | yes | yes |
//! | `lambda` | [`lambda::LambdaPublisher`] | no | no |
//! | `service_bus_queue` / `service_bus_topic` | [`service_bus::ServiceBusPublisher`] | yes | yes |
//! | `storage_queue` | [`storage_queue::StorageQueuePublisher`] | no | yes |

use async_trait::async_trait;
use std::fmt;

use crate::config::BackendKind;
use crate::error::DispatchResult;
use crate::models::{TaskInvocation, TaskResult};

pub mod auth;
pub mod destination_cache;
pub mod dispatch;
pub mod eventbridge;
pub mod lambda;
pub mod registry;
pub mod service_bus;
pub mod sns;
pub mod sqs;
pub mod storage_queue;
pub mod transports;

pub use destination_cache::DestinationCache;
pub use dispatch::{
    task_error_from, BackendCapabilities, CloudBackend, OutboundMessage, PublishError, Publisher,
};
pub use eventbridge::{EventBridgeBackend, EventBridgePublisher};
pub use lambda::{LambdaBackend, LambdaPublisher};
pub use registry::{build_backend, BackendRegistry};
pub use service_bus::{ServiceBusBackend, ServiceBusEntity, ServiceBusPublisher};
pub use sns::{SnsBackend, SnsPublisher};
pub use sqs::{SqsBackend, SqsPublisher};
pub use storage_queue::{StorageQueueBackend, StorageQueuePublisher};
pub use transports::Transports;

/// Contract shared by every backend variant
///
/// Implementations are shared across tasks as `Arc<dyn TaskBackend>`.
#[async_trait]
pub trait TaskBackend: Send + Sync + fmt::Debug {
    /// Configuration alias this backend was built for
    fn alias(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Destination used when an invocation names none
    fn default_destination(&self) -> &str;

    /// Accepts invocations with a future `run_after`
    fn supports_defer(&self) -> bool;

    /// Results can be looked up by the returned id
    fn supports_get_result(&self) -> bool;

    fn is_closed(&self) -> bool;

    /// Publish one invocation
    ///
    /// Transport failures are captured into the returned record (`FAILED` with one
    /// error). Configuration, destination resolution and validation failures are
    /// returned as `Err`.
    async fn enqueue(&self, invocation: &TaskInvocation) -> DispatchResult<TaskResult>;

    /// Release cached handles and the transport client; idempotent
    ///
    /// The backend is closed even when releasing fails; the failure is returned once.
    async fn close(&self) -> DispatchResult<()>;
}
