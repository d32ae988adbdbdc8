//! # Azure Service Bus Backends
//!
//! Queue and topic variants share one publisher; they differ only in which kind
//! of sender the namespace client hands out.
//!
//! Each message gets a locally generated id before sending. That id becomes the
//! result id on success, so workers can correlate without a round trip. With
//! `run_after` the message is scheduled for that instant instead of sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::auth::{build_client, SERVICE_BUS_AUTH};
use super::destination_cache::DestinationCache;
use super::dispatch::{BackendCapabilities, CloudBackend, OutboundMessage, PublishError, Publisher};
use super::transports::Transports;
use crate::config::{BackendConfig, BackendKind, ConfigResult, DispatchConfig};
use crate::constants::service_bus;
use crate::error::DispatchError;
use crate::messaging::{
    ServiceBusClient, ServiceBusMessage, ServiceBusSender, TransportResult,
};

/// Entity type a Service Bus backend sends to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceBusEntity {
    Queue,
    Topic,
}

impl ServiceBusEntity {
    pub fn backend_kind(&self) -> BackendKind {
        match self {
            Self::Queue => BackendKind::ServiceBusQueue,
            Self::Topic => BackendKind::ServiceBusTopic,
        }
    }

    fn default_name_key(&self) -> &'static str {
        match self {
            Self::Queue => service_bus::DEFAULT_QUEUE_NAME,
            Self::Topic => service_bus::DEFAULT_TOPIC_NAME,
        }
    }
}

pub struct ServiceBusPublisher {
    client: Arc<dyn ServiceBusClient>,
    entity: ServiceBusEntity,
    senders: DestinationCache<Arc<dyn ServiceBusSender>>,
    publish_timeout: Duration,
}

impl ServiceBusPublisher {
    pub fn new(
        client: Arc<dyn ServiceBusClient>,
        entity: ServiceBusEntity,
        publish_timeout: Duration,
    ) -> Self {
        Self {
            client,
            entity,
            senders: DestinationCache::new("service_bus_sender"),
            publish_timeout,
        }
    }

    pub fn cached_senders(&self) -> usize {
        self.senders.len()
    }

    async fn sender(&self, destination: &str) -> Result<Arc<dyn ServiceBusSender>, DispatchError> {
        self.senders
            .get_or_try_init(destination, || async {
                match self.entity {
                    ServiceBusEntity::Queue => self.client.queue_sender(destination),
                    ServiceBusEntity::Topic => self.client.topic_sender(destination),
                }
            })
            .await
            .map_err(|err| {
                DispatchError::destination_resolution(
                    self.entity.backend_kind().as_str(),
                    destination,
                    err.to_string(),
                )
            })
    }
}

#[async_trait]
impl Publisher for ServiceBusPublisher {
    fn kind(&self) -> BackendKind {
        self.entity.backend_kind()
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_defer: true,
            supports_get_result: true,
        }
    }

    async fn publish(&self, message: &OutboundMessage<'_>) -> Result<Option<String>, PublishError> {
        let sender = self.sender(message.destination).await?;
        let outbound = ServiceBusMessage::new(message.body);

        match message.run_after {
            Some(schedule_time) => {
                let sequence_numbers = sender
                    .schedule_message(&outbound, schedule_time, self.publish_timeout)
                    .await?;
                debug!(
                    message_id = %outbound.message_id,
                    ?sequence_numbers,
                    "Scheduled Service Bus message"
                );
            }
            None => {
                sender.send_message(&outbound, self.publish_timeout).await?;
            }
        }

        Ok(Some(outbound.message_id))
    }

    async fn close(&self) -> TransportResult<()> {
        for sender in self.senders.handles() {
            if let Err(err) = sender.close().await {
                warn!(error = %err, "Failed to close Service Bus sender");
            }
        }
        self.senders.clear();
        self.client.close().await
    }
}

pub type ServiceBusBackend = CloudBackend<ServiceBusPublisher>;

impl CloudBackend<ServiceBusPublisher> {
    /// Requires the entity's default name option plus the auth options
    /// (connection string, or namespace FQDN for identity auth)
    pub fn from_config(
        alias: &str,
        entity: ServiceBusEntity,
        config: &BackendConfig,
        dispatch: &DispatchConfig,
        transports: &Transports,
    ) -> ConfigResult<Self> {
        let kind = entity.backend_kind();
        let default_name = config
            .options
            .required_str(kind.as_str(), entity.default_name_key())?;

        let factory = transports.service_bus_factory(kind)?;
        let client = build_client(
            kind,
            &config.options,
            &SERVICE_BUS_AUTH,
            factory.as_ref(),
            &transports.credentials,
        )?;

        Ok(CloudBackend::new(
            alias,
            default_name,
            &config.queues,
            ServiceBusPublisher::new(client, entity, dispatch.publish_timeout()),
        ))
    }
}
