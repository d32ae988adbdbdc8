//! # In-Memory Cloud Provider
//!
//! Thread-safe stand-in for every transport collaborator, for tests and local
//! development.
//!
//! ## Features
//!
//! - **Recording**: every published message and created schedule is kept in order
//! - **Call counting**: `call_count(operation, target)` exposes how often each remote
//!   operation ran, which makes handle caching observable
//! - **Failure injection**: publishes, lookups and client construction can be made
//!   to fail with a chosen [`FailureMode`]
//! - **Client factories**: implements [`AwsClientFactory`] and both [`ClientFactory`]
//!   flavors so backends can be built from configuration against it

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use crate::messaging::credentials::Credential;
use crate::messaging::errors::{TransportError, TransportResult};
use crate::messaging::traits::{
    AwsClientFactory, ClientFactory, FunctionService, QueueService, ScheduleRequest,
    SchedulerService, ServiceBusClient, ServiceBusMessage, ServiceBusSender, StorageQueueClient,
    StorageQueueService, TopicService,
};

const QUEUE_URL_PREFIX: &str = "memory://queue/";
const QUEUE_ARN_PREFIX: &str = "arn:aws:sqs:memory:000000000000:";

/// Transport a message was published through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    Queue,
    Topic,
    Scheduler,
    Function,
    ServiceBus,
    StorageQueue,
}

/// One recorded publish
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub transport: TransportKind,
    /// Queue URL, topic ARN, schedule target ARN, function name or entity name
    pub destination: String,
    pub body: String,
    pub message_id: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Failure to inject into an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    Throttled,
    AccessDenied,
    Network,
    Timeout,
    Service,
}

impl FailureMode {
    fn to_error(self, operation: &str) -> TransportError {
        match self {
            Self::Throttled => TransportError::throttled(operation),
            Self::AccessDenied => TransportError::access_denied(operation, "injected failure"),
            Self::Network => TransportError::network(operation, "connection reset"),
            Self::Timeout => TransportError::timeout(operation, 5),
            Self::Service => TransportError::service(
                operation,
                std::io::Error::new(std::io::ErrorKind::Other, "InternalFailure: injected"),
            ),
        }
    }
}

/// How a client was constructed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionMethod {
    Region(String),
    ConnectionString(String),
    Identity {
        address: String,
        credential_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub transport: TransportKind,
    pub method: ConnectionMethod,
    /// Client-level operation timeout, for clients configured with one
    pub timeout: Option<Duration>,
}

#[derive(Debug, Default)]
struct CloudState {
    queues: DashMap<String, ()>,
    auto_create_queues: AtomicBool,
    published: Mutex<Vec<PublishedMessage>>,
    schedules: Mutex<Vec<ScheduleRequest>>,
    schedule_names: Mutex<HashSet<String>>,
    calls: DashMap<String, usize>,
    connections: Mutex<Vec<ConnectionRecord>>,
    publish_failure: Mutex<Option<FailureMode>>,
    lookup_failure: Mutex<Option<FailureMode>>,
    connection_failure: Mutex<Option<FailureMode>>,
    lookup_delay: Mutex<Option<Duration>>,
    omit_request_ids: AtomicBool,
}

/// In-memory implementation of every transport trait
///
/// Cloning is cheap; clones share state.
///
/// # Example
///
/// ```rust
/// use tasks_cloud::messaging::{InMemoryCloud, QueueService};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cloud = InMemoryCloud::with_queues(&["email-ingestor"]);
///
/// let url = cloud.get_queue_url("email-ingestor").await?;
/// let id = cloud.send_message(&url, r#"{"task":"t","args":[],"kwargs":{}}"#).await?;
///
/// assert_eq!(cloud.published().len(), 1);
/// assert_eq!(cloud.call_count("GetQueueUrl", "email-ingestor"), 1);
/// # let _ = id;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryCloud {
    state: Arc<CloudState>,
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cloud with pre-created queues
    pub fn with_queues(queue_names: &[&str]) -> Self {
        let cloud = Self::new();
        for name in queue_names {
            cloud.create_queue(name);
        }
        cloud
    }

    pub fn create_queue(&self, queue_name: &str) {
        self.state.queues.insert(queue_name.to_string(), ());
    }

    /// Resolve any queue name, creating it on first lookup
    pub fn auto_create_queues(self) -> Self {
        self.state.auto_create_queues.store(true, Ordering::SeqCst);
        self
    }

    /// Delay remote lookups to widen race windows in concurrency tests
    pub fn with_lookup_delay(self, delay: Duration) -> Self {
        *self.state.lookup_delay.lock() = Some(delay);
        self
    }

    /// Function invocations report no request id
    pub fn without_request_ids(self) -> Self {
        self.state.omit_request_ids.store(true, Ordering::SeqCst);
        self
    }

    pub fn fail_publishes_with(&self, mode: Option<FailureMode>) {
        *self.state.publish_failure.lock() = mode;
    }

    pub fn fail_lookups_with(&self, mode: Option<FailureMode>) {
        *self.state.lookup_failure.lock() = mode;
    }

    pub fn fail_connections_with(&self, mode: Option<FailureMode>) {
        *self.state.connection_failure.lock() = mode;
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.state.published.lock().clone()
    }

    pub fn schedules(&self) -> Vec<ScheduleRequest> {
        self.state.schedules.lock().clone()
    }

    pub fn connections(&self) -> Vec<ConnectionRecord> {
        self.state.connections.lock().clone()
    }

    pub fn call_count(&self, operation: &str, target: &str) -> usize {
        self.state
            .calls
            .get(&call_key(operation, target))
            .map(|count| *count)
            .unwrap_or(0)
    }

    /// Total calls of `operation` across all targets
    pub fn total_calls(&self, operation: &str) -> usize {
        let prefix = format!("{operation}:");
        self.state
            .calls
            .iter()
            .filter(|entry| entry.key().starts_with(&prefix))
            .map(|entry| *entry.value())
            .sum()
    }

    pub fn queue_url(queue_name: &str) -> String {
        format!("{QUEUE_URL_PREFIX}{queue_name}")
    }

    pub fn queue_arn(queue_name: &str) -> String {
        format!("{QUEUE_ARN_PREFIX}{queue_name}")
    }

    fn record_call(&self, operation: &str, target: &str) {
        *self
            .state
            .calls
            .entry(call_key(operation, target))
            .or_insert(0) += 1;
    }

    fn check_publish(&self, operation: &str) -> TransportResult<()> {
        match *self.state.publish_failure.lock() {
            Some(mode) => Err(mode.to_error(operation)),
            None => Ok(()),
        }
    }

    async fn check_lookup(&self, operation: &str) -> TransportResult<()> {
        let delay = *self.state.lookup_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match *self.state.lookup_failure.lock() {
            Some(mode) => Err(mode.to_error(operation)),
            None => Ok(()),
        }
    }

    fn connect(
        &self,
        transport: TransportKind,
        method: ConnectionMethod,
        timeout: Option<Duration>,
    ) -> TransportResult<()> {
        if let Some(mode) = *self.state.connection_failure.lock() {
            return Err(mode.to_error("Connect"));
        }
        debug!(?transport, ?method, ?timeout, "In-memory client constructed");
        self.state.connections.lock().push(ConnectionRecord {
            transport,
            method,
            timeout,
        });
        Ok(())
    }

    fn record_publish(&self, message: PublishedMessage) {
        self.state.published.lock().push(message);
    }

    fn queue_known(&self, queue_name: &str) -> bool {
        if self.state.auto_create_queues.load(Ordering::SeqCst) {
            self.create_queue(queue_name);
            return true;
        }
        self.state.queues.contains_key(queue_name)
    }
}

fn call_key(operation: &str, target: &str) -> String {
    format!("{operation}:{target}")
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[async_trait]
impl QueueService for InMemoryCloud {
    async fn get_queue_url(&self, queue_name: &str) -> TransportResult<String> {
        self.record_call("GetQueueUrl", queue_name);
        self.check_lookup("GetQueueUrl").await?;

        if !self.queue_known(queue_name) {
            return Err(TransportError::not_found(format!("queue/{queue_name}")));
        }
        Ok(Self::queue_url(queue_name))
    }

    async fn get_queue_arn(&self, queue_url: &str) -> TransportResult<String> {
        self.record_call("GetQueueAttributes", queue_url);
        self.check_lookup("GetQueueAttributes").await?;

        let queue_name = queue_url
            .strip_prefix(QUEUE_URL_PREFIX)
            .filter(|name| self.state.queues.contains_key(*name))
            .ok_or_else(|| TransportError::not_found(queue_url.to_string()))?;
        Ok(Self::queue_arn(queue_name))
    }

    async fn send_message(&self, queue_url: &str, body: &str) -> TransportResult<String> {
        self.record_call("SendMessage", queue_url);
        self.check_publish("SendMessage")?;

        let message_id = new_id();
        self.record_publish(PublishedMessage {
            transport: TransportKind::Queue,
            destination: queue_url.to_string(),
            body: body.to_string(),
            message_id: Some(message_id.clone()),
            scheduled_for: None,
        });
        Ok(message_id)
    }
}

#[async_trait]
impl TopicService for InMemoryCloud {
    async fn publish(&self, topic_arn: &str, message: &str) -> TransportResult<String> {
        self.record_call("Publish", topic_arn);
        self.check_publish("Publish")?;

        let message_id = new_id();
        self.record_publish(PublishedMessage {
            transport: TransportKind::Topic,
            destination: topic_arn.to_string(),
            body: message.to_string(),
            message_id: Some(message_id.clone()),
            scheduled_for: None,
        });
        Ok(message_id)
    }
}

#[async_trait]
impl SchedulerService for InMemoryCloud {
    async fn create_schedule(&self, request: &ScheduleRequest) -> TransportResult<()> {
        self.record_call("CreateSchedule", &request.name);
        self.check_publish("CreateSchedule")?;

        if !self.state.schedule_names.lock().insert(request.name.clone()) {
            return Err(TransportError::service(
                "CreateSchedule",
                std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    format!("ConflictException: schedule {} already exists", request.name),
                ),
            ));
        }

        self.state.schedules.lock().push(request.clone());
        self.record_publish(PublishedMessage {
            transport: TransportKind::Scheduler,
            destination: request.target.arn.clone(),
            body: request.target.input.clone(),
            message_id: Some(request.name.clone()),
            scheduled_for: None,
        });
        Ok(())
    }
}

#[async_trait]
impl FunctionService for InMemoryCloud {
    async fn invoke_event(
        &self,
        function_name: &str,
        payload: &str,
    ) -> TransportResult<Option<String>> {
        self.record_call("Invoke", function_name);
        self.check_publish("Invoke")?;

        let request_id = if self.state.omit_request_ids.load(Ordering::SeqCst) {
            None
        } else {
            Some(new_id())
        };
        self.record_publish(PublishedMessage {
            transport: TransportKind::Function,
            destination: function_name.to_string(),
            body: payload.to_string(),
            message_id: request_id.clone(),
            scheduled_for: None,
        });
        Ok(request_id)
    }
}

/// Service Bus sender bound to one entity
#[derive(Debug)]
struct InMemorySender {
    cloud: InMemoryCloud,
    entity: String,
    closed: AtomicBool,
}

impl InMemorySender {
    fn ensure_open(&self, operation: &str) -> TransportResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::service(
                operation,
                std::io::Error::new(std::io::ErrorKind::NotConnected, "sender is closed"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceBusSender for InMemorySender {
    async fn send_message(
        &self,
        message: &ServiceBusMessage,
        _timeout: Duration,
    ) -> TransportResult<()> {
        self.cloud.record_call("SendMessages", &self.entity);
        self.ensure_open("SendMessages")?;
        self.cloud.check_publish("SendMessages")?;

        self.cloud.record_publish(PublishedMessage {
            transport: TransportKind::ServiceBus,
            destination: self.entity.clone(),
            body: message.body.clone(),
            message_id: Some(message.message_id.clone()),
            scheduled_for: None,
        });
        Ok(())
    }

    async fn schedule_message(
        &self,
        message: &ServiceBusMessage,
        schedule_time: DateTime<Utc>,
        _timeout: Duration,
    ) -> TransportResult<Vec<i64>> {
        self.cloud.record_call("ScheduleMessages", &self.entity);
        self.ensure_open("ScheduleMessages")?;
        self.cloud.check_publish("ScheduleMessages")?;

        let sequence_number = {
            let mut published = self.cloud.state.published.lock();
            published.push(PublishedMessage {
                transport: TransportKind::ServiceBus,
                destination: self.entity.clone(),
                body: message.body.clone(),
                message_id: Some(message.message_id.clone()),
                scheduled_for: Some(schedule_time),
            });
            published.len() as i64
        };
        Ok(vec![sequence_number])
    }

    async fn close(&self) -> TransportResult<()> {
        self.cloud.record_call("CloseSender", &self.entity);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl ServiceBusClient for InMemoryCloud {
    fn queue_sender(&self, queue_name: &str) -> TransportResult<Arc<dyn ServiceBusSender>> {
        self.record_call("QueueSender", queue_name);
        Ok(Arc::new(InMemorySender {
            cloud: self.clone(),
            entity: queue_name.to_string(),
            closed: AtomicBool::new(false),
        }))
    }

    fn topic_sender(&self, topic_name: &str) -> TransportResult<Arc<dyn ServiceBusSender>> {
        self.record_call("TopicSender", topic_name);
        Ok(Arc::new(InMemorySender {
            cloud: self.clone(),
            entity: topic_name.to_string(),
            closed: AtomicBool::new(false),
        }))
    }

    async fn close(&self) -> TransportResult<()> {
        self.record_call("CloseClient", "service_bus");
        Ok(())
    }
}

#[derive(Debug)]
struct InMemoryStorageQueueClient {
    cloud: InMemoryCloud,
    queue_name: String,
}

#[async_trait]
impl StorageQueueClient for InMemoryStorageQueueClient {
    async fn send_message(&self, content: &str, _timeout: Duration) -> TransportResult<String> {
        self.cloud.record_call("PutMessage", &self.queue_name);
        self.cloud.check_publish("PutMessage")?;

        let message_id = new_id();
        self.cloud.record_publish(PublishedMessage {
            transport: TransportKind::StorageQueue,
            destination: self.queue_name.clone(),
            body: content.to_string(),
            message_id: Some(message_id.clone()),
            scheduled_for: None,
        });
        Ok(message_id)
    }
}

#[async_trait]
impl StorageQueueService for InMemoryCloud {
    fn queue_client(&self, queue_name: &str) -> TransportResult<Arc<dyn StorageQueueClient>> {
        self.record_call("QueueClient", queue_name);
        Ok(Arc::new(InMemoryStorageQueueClient {
            cloud: self.clone(),
            queue_name: queue_name.to_string(),
        }))
    }

    async fn close(&self) -> TransportResult<()> {
        self.record_call("CloseClient", "storage_queue");
        Ok(())
    }
}

impl AwsClientFactory for InMemoryCloud {
    fn queue_service(
        &self,
        region: &str,
        timeout: Duration,
    ) -> TransportResult<Arc<dyn QueueService>> {
        self.connect(
            TransportKind::Queue,
            ConnectionMethod::Region(region.to_string()),
            Some(timeout),
        )?;
        Ok(Arc::new(self.clone()))
    }

    fn topic_service(
        &self,
        region: &str,
        timeout: Duration,
    ) -> TransportResult<Arc<dyn TopicService>> {
        self.connect(
            TransportKind::Topic,
            ConnectionMethod::Region(region.to_string()),
            Some(timeout),
        )?;
        Ok(Arc::new(self.clone()))
    }

    fn scheduler_service(
        &self,
        region: &str,
        timeout: Duration,
    ) -> TransportResult<Arc<dyn SchedulerService>> {
        self.connect(
            TransportKind::Scheduler,
            ConnectionMethod::Region(region.to_string()),
            Some(timeout),
        )?;
        Ok(Arc::new(self.clone()))
    }

    fn function_service(
        &self,
        region: &str,
        timeout: Duration,
    ) -> TransportResult<Arc<dyn FunctionService>> {
        self.connect(
            TransportKind::Function,
            ConnectionMethod::Region(region.to_string()),
            Some(timeout),
        )?;
        Ok(Arc::new(self.clone()))
    }
}

impl ClientFactory<dyn ServiceBusClient> for InMemoryCloud {
    fn from_connection_string(
        &self,
        connection_string: &str,
    ) -> TransportResult<Arc<dyn ServiceBusClient>> {
        self.connect(
            TransportKind::ServiceBus,
            ConnectionMethod::ConnectionString(connection_string.to_string()),
            None,
        )?;
        Ok(Arc::new(self.clone()))
    }

    fn from_identity(
        &self,
        address: &str,
        credential: Arc<dyn Credential>,
    ) -> TransportResult<Arc<dyn ServiceBusClient>> {
        self.connect(
            TransportKind::ServiceBus,
            ConnectionMethod::Identity {
                address: address.to_string(),
                credential_type: credential.credential_type().to_string(),
            },
            None,
        )?;
        Ok(Arc::new(self.clone()))
    }
}

impl ClientFactory<dyn StorageQueueService> for InMemoryCloud {
    fn from_connection_string(
        &self,
        connection_string: &str,
    ) -> TransportResult<Arc<dyn StorageQueueService>> {
        self.connect(
            TransportKind::StorageQueue,
            ConnectionMethod::ConnectionString(connection_string.to_string()),
            None,
        )?;
        Ok(Arc::new(self.clone()))
    }

    fn from_identity(
        &self,
        address: &str,
        credential: Arc<dyn Credential>,
    ) -> TransportResult<Arc<dyn StorageQueueService>> {
        self.connect(
            TransportKind::StorageQueue,
            ConnectionMethod::Identity {
                address: address.to_string(),
                credential_type: credential.credential_type().to_string(),
            },
            None,
        )?;
        Ok(Arc::new(self.clone()))
    }
}
