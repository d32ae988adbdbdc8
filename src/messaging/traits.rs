//! # Transport Collaborator Traits
//!
//! The narrow capability surface backends need from cloud SDKs. Each trait is
//! implementable by a thin adapter over the vendor client; retries, signing and
//! authentication stay inside that adapter.
//!
//! | Trait | Used by |
//! |---|---|
//! | [`QueueService`] | SQS backend, scheduler target lookup |
//! | [`TopicService`] | SNS backend |
//! | [`SchedulerService`] | EventBridge Scheduler backend |
//! | [`FunctionService`] | Lambda backend |
//! | [`ServiceBusClient`] / [`ServiceBusSender`] | Service Bus queue and topic backends |
//! | [`StorageQueueService`] / [`StorageQueueClient`] | Storage Account queue backend |

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::credentials::Credential;
use super::errors::TransportResult;

/// Simple queue service (SQS-style)
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Resolve a queue name to its URL (remote lookup)
    async fn get_queue_url(&self, queue_name: &str) -> TransportResult<String>;

    /// Resolve a queue URL to its ARN (remote lookup)
    async fn get_queue_arn(&self, queue_url: &str) -> TransportResult<String>;

    /// Send one opaque message; returns the transport message id
    async fn send_message(&self, queue_url: &str, body: &str) -> TransportResult<String>;
}

/// Pub/sub topic service (SNS-style)
#[async_trait]
pub trait TopicService: Send + Sync {
    /// Broadcast to every subscriber; returns the transport message id
    async fn publish(&self, topic_arn: &str, message: &str) -> TransportResult<String>;
}

/// One-shot scheduled trigger definition (EventBridge Scheduler-style)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub name: String,
    /// `at(YYYY-MM-DDTHH:MM:SS)`
    pub schedule_expression: String,
    pub schedule_expression_timezone: String,
    pub state: ScheduleState,
    pub action_after_completion: ActionAfterCompletion,
    pub flexible_time_window: FlexibleTimeWindow,
    pub target: ScheduleTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleState {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionAfterCompletion {
    None,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlexibleTimeWindow {
    Off,
    Flexible { maximum_window_minutes: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTarget {
    pub arn: String,
    pub role_arn: String,
    pub input: String,
}

/// Delayed trigger service
#[async_trait]
pub trait SchedulerService: Send + Sync {
    async fn create_schedule(&self, request: &ScheduleRequest) -> TransportResult<()>;
}

/// Serverless function service (Lambda-style)
#[async_trait]
pub trait FunctionService: Send + Sync {
    /// Event-style (asynchronous) invocation; returns the request id when provided
    async fn invoke_event(
        &self,
        function_name: &str,
        payload: &str,
    ) -> TransportResult<Option<String>>;
}

/// Message handed to a Service Bus sender
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBusMessage {
    pub message_id: String,
    pub body: String,
}

impl ServiceBusMessage {
    /// New message with a locally generated id
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            body: body.into(),
        }
    }
}

/// Sender bound to one queue or topic
#[async_trait]
pub trait ServiceBusSender: Send + Sync {
    async fn send_message(
        &self,
        message: &ServiceBusMessage,
        timeout: Duration,
    ) -> TransportResult<()>;

    /// Enqueue for delivery at `schedule_time`; returns the sequence numbers
    async fn schedule_message(
        &self,
        message: &ServiceBusMessage,
        schedule_time: DateTime<Utc>,
        timeout: Duration,
    ) -> TransportResult<Vec<i64>>;

    async fn close(&self) -> TransportResult<()>;
}

/// Namespace-level Service Bus client
///
/// Sender construction is local (no round trip); the connection is opened lazily
/// by the sender itself.
#[async_trait]
pub trait ServiceBusClient: Send + Sync {
    fn queue_sender(&self, queue_name: &str) -> TransportResult<Arc<dyn ServiceBusSender>>;

    fn topic_sender(&self, topic_name: &str) -> TransportResult<Arc<dyn ServiceBusSender>>;

    async fn close(&self) -> TransportResult<()>;
}

/// Client bound to one storage queue
#[async_trait]
pub trait StorageQueueClient: Send + Sync {
    /// Returns the transport message id
    async fn send_message(&self, content: &str, timeout: Duration) -> TransportResult<String>;
}

/// Account-level storage queue service
#[async_trait]
pub trait StorageQueueService: Send + Sync {
    fn queue_client(&self, queue_name: &str) -> TransportResult<Arc<dyn StorageQueueClient>>;

    async fn close(&self) -> TransportResult<()>;
}

/// Constructs AWS service clients for a region
///
/// AWS calls take no per-call timeout; `timeout` is applied to the client's
/// operation timeout when it is built.
pub trait AwsClientFactory: Send + Sync {
    fn queue_service(&self, region: &str, timeout: Duration)
        -> TransportResult<Arc<dyn QueueService>>;

    fn topic_service(&self, region: &str, timeout: Duration)
        -> TransportResult<Arc<dyn TopicService>>;

    fn scheduler_service(
        &self,
        region: &str,
        timeout: Duration,
    ) -> TransportResult<Arc<dyn SchedulerService>>;

    fn function_service(
        &self,
        region: &str,
        timeout: Duration,
    ) -> TransportResult<Arc<dyn FunctionService>>;
}

/// Constructs a client either from a connection string or from an address plus credential
pub trait ClientFactory<C: ?Sized>: Send + Sync {
    fn from_connection_string(&self, connection_string: &str) -> TransportResult<Arc<C>>;

    fn from_identity(
        &self,
        address: &str,
        credential: Arc<dyn Credential>,
    ) -> TransportResult<Arc<C>>;
}
