//! Simple queue (SQS) backend.

use std::sync::Arc;

use async_trait::async_trait;

use super::destination_cache::DestinationCache;
use super::dispatch::{BackendCapabilities, CloudBackend, OutboundMessage, PublishError, Publisher};
use super::transports::{client_construction_error, Transports};
use crate::config::{BackendConfig, BackendKind, ConfigResult, DispatchConfig};
use crate::constants::aws;
use crate::messaging::{QueueService, TransportResult};

/// Publishes each task as one queue message
///
/// Queue URLs are looked up once per queue name and cached. A failed lookup is
/// a publish failure and is captured into the result.
pub struct SqsPublisher {
    queues: Arc<dyn QueueService>,
    queue_urls: DestinationCache<String>,
}

impl SqsPublisher {
    pub fn new(queues: Arc<dyn QueueService>) -> Self {
        Self {
            queues,
            queue_urls: DestinationCache::new("sqs_queue_url"),
        }
    }

    pub fn cached_queue_urls(&self) -> usize {
        self.queue_urls.len()
    }
}

#[async_trait]
impl Publisher for SqsPublisher {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqs
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_defer: false,
            supports_get_result: true,
        }
    }

    async fn publish(&self, message: &OutboundMessage<'_>) -> Result<Option<String>, PublishError> {
        let queue_url = self
            .queue_urls
            .get_or_try_init(message.destination, || {
                self.queues.get_queue_url(message.destination)
            })
            .await?;

        let message_id = self.queues.send_message(&queue_url, message.body).await?;
        Ok(Some(message_id))
    }

    async fn close(&self) -> TransportResult<()> {
        self.queue_urls.clear();
        Ok(())
    }
}

pub type SqsBackend = CloudBackend<SqsPublisher>;

impl CloudBackend<SqsPublisher> {
    /// Requires `AWS_REGION` and `AWS_DEFAULT_QUEUE_NAME`
    pub fn from_config(
        alias: &str,
        config: &BackendConfig,
        dispatch: &DispatchConfig,
        transports: &Transports,
    ) -> ConfigResult<Self> {
        let kind = BackendKind::Sqs;
        let region = config.options.required_str(kind.as_str(), aws::REGION)?;
        let default_queue = config
            .options
            .required_str(kind.as_str(), aws::DEFAULT_QUEUE_NAME)?;

        let queues = transports
            .aws_factory(kind)?
            .queue_service(&region, dispatch.publish_timeout())
            .map_err(client_construction_error(kind))?;

        Ok(CloudBackend::new(
            alias,
            default_queue,
            &config.queues,
            SqsPublisher::new(queues),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::TaskBackend;
    use crate::config::ConfigurationError;
    use crate::config::BackendOptions;
    use crate::messaging::InMemoryCloud;
    use crate::models::{TaskInvocation, TaskResultStatus};

    fn config() -> BackendConfig {
        BackendConfig::new(
            BackendKind::Sqs,
            BackendOptions::new()
                .with(aws::REGION, "ap-south-1")
                .with(aws::DEFAULT_QUEUE_NAME, "email-ingestor"),
        )
    }

    fn build(cloud: &InMemoryCloud) -> SqsBackend {
        SqsBackend::from_config(
            "sqs",
            &config(),
            &DispatchConfig::default(),
            &Transports::in_memory(cloud),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_region_fails_before_any_call() {
        let cloud = InMemoryCloud::new();
        let mut config = config();
        config.options = BackendOptions::new().with(aws::DEFAULT_QUEUE_NAME, "email-ingestor");

        let err = SqsBackend::from_config(
            "sqs",
            &config,
            &DispatchConfig::default(),
            &Transports::in_memory(&cloud),
        )
        .err()
        .unwrap();

        assert_eq!(err, ConfigurationError::missing_option("sqs", aws::REGION));
        assert!(cloud.connections().is_empty());
    }

    #[tokio::test]
    async fn test_queue_url_lookup_is_cached() {
        let cloud = InMemoryCloud::with_queues(&["email-ingestor"]);
        let backend = build(&cloud);

        for _ in 0..3 {
            let result = backend.enqueue(&TaskInvocation::new("send_email")).await.unwrap();
            assert_eq!(result.status(), TaskResultStatus::Ready);
        }

        assert_eq!(cloud.call_count("GetQueueUrl", "email-ingestor"), 1);
        assert_eq!(backend.publisher().cached_queue_urls(), 1);
        assert_eq!(cloud.published().len(), 3);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_captured_and_retried() {
        let cloud = InMemoryCloud::new();
        let backend = build(&cloud);

        let result = backend.enqueue(&TaskInvocation::new("send_email")).await.unwrap();
        assert_eq!(result.status(), TaskResultStatus::Failed);
        assert!(result.errors()[0].exception_class_path.ends_with("NotFound"));

        cloud.create_queue("email-ingestor");
        let result = backend.enqueue(&TaskInvocation::new("send_email")).await.unwrap();
        assert_eq!(result.status(), TaskResultStatus::Ready);
        assert_eq!(cloud.call_count("GetQueueUrl", "email-ingestor"), 2);
    }

    #[tokio::test]
    async fn test_explicit_destination_wins() {
        let cloud = InMemoryCloud::with_queues(&["email-ingestor", "priority"]);
        let backend = build(&cloud);

        backend
            .enqueue(&TaskInvocation::new("send_email").with_destination("priority"))
            .await
            .unwrap();
        assert_eq!(cloud.published()[0].destination, InMemoryCloud::queue_url("priority"));
    }

    #[tokio::test]
    async fn test_close_drops_cached_queue_urls() {
        let cloud = InMemoryCloud::with_queues(&["email-ingestor"]);
        let backend = build(&cloud);

        backend.enqueue(&TaskInvocation::new("send_email")).await.unwrap();
        assert_eq!(backend.publisher().cached_queue_urls(), 1);

        backend.close().await.unwrap();
        assert_eq!(backend.publisher().cached_queue_urls(), 0);
    }

    #[test]
    fn test_client_uses_publish_timeout() {
        let cloud = InMemoryCloud::new();
        let dispatch = DispatchConfig {
            publish_timeout_seconds: 9,
            ..DispatchConfig::default()
        };
        SqsBackend::from_config("sqs", &config(), &dispatch, &Transports::in_memory(&cloud)).unwrap();

        assert_eq!(
            cloud.connections()[0].timeout,
            Some(std::time::Duration::from_secs(9))
        );
    }

    #[test]
    fn test_capabilities() {
        let backend = build(&InMemoryCloud::new());
        assert!(!backend.supports_defer());
        assert!(backend.supports_get_result());
    }
}
