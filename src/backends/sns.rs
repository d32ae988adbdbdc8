//! Pub/sub topic (SNS) backend.

use std::sync::Arc;

use async_trait::async_trait;

use super::dispatch::{BackendCapabilities, CloudBackend, OutboundMessage, PublishError, Publisher};
use super::transports::{client_construction_error, Transports};
use crate::config::{BackendConfig, BackendKind, ConfigResult, DispatchConfig};
use crate::constants::aws;
use crate::messaging::{TopicService, TransportResult};

/// Broadcasts each task to a topic addressed as `arn_prefix + topic name`
pub struct SnsPublisher {
    topics: Arc<dyn TopicService>,
    arn_prefix: String,
}

impl SnsPublisher {
    pub fn new(topics: Arc<dyn TopicService>, arn_prefix: impl Into<String>) -> Self {
        Self {
            topics,
            arn_prefix: arn_prefix.into(),
        }
    }

    /// `destination` is already the effective one: explicit name, else the default
    pub fn topic_arn(&self, destination: &str) -> String {
        format!("{}{}", self.arn_prefix, destination)
    }
}

#[async_trait]
impl Publisher for SnsPublisher {
    fn kind(&self) -> BackendKind {
        BackendKind::Sns
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_defer: false,
            supports_get_result: true,
        }
    }

    async fn publish(&self, message: &OutboundMessage<'_>) -> Result<Option<String>, PublishError> {
        let topic_arn = self.topic_arn(message.destination);
        let message_id = self.topics.publish(&topic_arn, message.body).await?;
        Ok(Some(message_id))
    }

    /// Topic ARNs are derived locally; nothing is cached
    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }
}

pub type SnsBackend = CloudBackend<SnsPublisher>;

impl CloudBackend<SnsPublisher> {
    /// Requires `AWS_REGION`, `AWS_DEFAULT_TOPIC_NAME` and `AWS_SNS_ARN_PREFIX`
    pub fn from_config(
        alias: &str,
        config: &BackendConfig,
        dispatch: &DispatchConfig,
        transports: &Transports,
    ) -> ConfigResult<Self> {
        let kind = BackendKind::Sns;
        let options = &config.options;
        let region = options.required_str(kind.as_str(), aws::REGION)?;
        let default_topic = options.required_str(kind.as_str(), aws::DEFAULT_TOPIC_NAME)?;
        let arn_prefix = options.required_str(kind.as_str(), aws::SNS_ARN_PREFIX)?;

        let topics = transports
            .aws_factory(kind)?
            .topic_service(&region, dispatch.publish_timeout())
            .map_err(client_construction_error(kind))?;

        Ok(CloudBackend::new(
            alias,
            default_topic,
            &config.queues,
            SnsPublisher::new(topics, arn_prefix),
        ))
    }
}
