//! Azure Storage Account queue backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::auth::{build_client, STORAGE_QUEUE_AUTH};
use super::destination_cache::DestinationCache;
use super::dispatch::{BackendCapabilities, CloudBackend, OutboundMessage, PublishError, Publisher};
use super::transports::Transports;
use crate::config::{BackendConfig, BackendKind, ConfigResult, DispatchConfig};
use crate::constants::storage_queue;
use crate::error::DispatchError;
use crate::messaging::{StorageQueueClient, StorageQueueService, TransportResult};

/// Sends each task as one storage queue message; queue clients cached by name
pub struct StorageQueuePublisher {
    service: Arc<dyn StorageQueueService>,
    clients: DestinationCache<Arc<dyn StorageQueueClient>>,
    publish_timeout: Duration,
}

impl StorageQueuePublisher {
    pub fn new(service: Arc<dyn StorageQueueService>, publish_timeout: Duration) -> Self {
        Self {
            service,
            clients: DestinationCache::new("storage_queue_client"),
            publish_timeout,
        }
    }

    pub fn cached_clients(&self) -> usize {
        self.clients.len()
    }

    async fn queue_client(
        &self,
        queue_name: &str,
    ) -> Result<Arc<dyn StorageQueueClient>, DispatchError> {
        self.clients
            .get_or_try_init(queue_name, || async { self.service.queue_client(queue_name) })
            .await
            .map_err(|err| {
                DispatchError::destination_resolution(
                    BackendKind::StorageQueue.as_str(),
                    queue_name,
                    err.to_string(),
                )
            })
    }
}

#[async_trait]
impl Publisher for StorageQueuePublisher {
    fn kind(&self) -> BackendKind {
        BackendKind::StorageQueue
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_defer: false,
            supports_get_result: true,
        }
    }

    async fn publish(&self, message: &OutboundMessage<'_>) -> Result<Option<String>, PublishError> {
        let client = self.queue_client(message.destination).await?;
        let message_id = client
            .send_message(message.body, self.publish_timeout)
            .await?;
        Ok(Some(message_id))
    }

    async fn close(&self) -> TransportResult<()> {
        self.clients.clear();
        self.service.close().await
    }
}

pub type StorageQueueBackend = CloudBackend<StorageQueuePublisher>;

impl CloudBackend<StorageQueuePublisher> {
    /// Requires `STORAGE_ACCOUNT_QUEUE_DEFAULT_QUEUE_NAME` plus the auth options
    /// (connection string, or account URL for identity auth)
    pub fn from_config(
        alias: &str,
        config: &BackendConfig,
        dispatch: &DispatchConfig,
        transports: &Transports,
    ) -> ConfigResult<Self> {
        let kind = BackendKind::StorageQueue;
        let default_queue = config
            .options
            .required_str(kind.as_str(), storage_queue::DEFAULT_QUEUE_NAME)?;

        let factory = transports.storage_queue_factory(kind)?;
        let service = build_client(
            kind,
            &config.options,
            &STORAGE_QUEUE_AUTH,
            factory.as_ref(),
            &transports.credentials,
        )?;

        Ok(CloudBackend::new(
            alias,
            default_queue,
            &config.queues,
            StorageQueuePublisher::new(service, dispatch.publish_timeout()),
        ))
    }
}
