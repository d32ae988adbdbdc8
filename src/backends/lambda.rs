//! Serverless function (Lambda) backend.

use std::sync::Arc;

use async_trait::async_trait;

use super::dispatch::{BackendCapabilities, CloudBackend, OutboundMessage, PublishError, Publisher};
use super::transports::{client_construction_error, Transports};
use crate::config::{BackendConfig, BackendKind, ConfigResult, DispatchConfig};
use crate::constants::aws;
use crate::messaging::{FunctionService, TransportResult};

/// Invokes the destination function asynchronously with the payload as its event
///
/// Fire-and-forget: no result retrieval, the recorded id is the invocation's
/// request id when the transport reports one.
pub struct LambdaPublisher {
    functions: Arc<dyn FunctionService>,
}

impl LambdaPublisher {
    pub fn new(functions: Arc<dyn FunctionService>) -> Self {
        Self { functions }
    }
}

#[async_trait]
impl Publisher for LambdaPublisher {
    fn kind(&self) -> BackendKind {
        BackendKind::Lambda
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_defer: false,
            supports_get_result: false,
        }
    }

    async fn publish(&self, message: &OutboundMessage<'_>) -> Result<Option<String>, PublishError> {
        let request_id = self
            .functions
            .invoke_event(message.destination, message.body)
            .await?;
        Ok(request_id)
    }

    async fn close(&self) -> TransportResult<()> {
        Ok(())
    }
}

pub type LambdaBackend = CloudBackend<LambdaPublisher>;

impl CloudBackend<LambdaPublisher> {
    /// Requires `AWS_REGION` and `AWS_DEFAULT_LAMBDA_FUNCTION_NAME`
    pub fn from_config(
        alias: &str,
        config: &BackendConfig,
        dispatch: &DispatchConfig,
        transports: &Transports,
    ) -> ConfigResult<Self> {
        let kind = BackendKind::Lambda;
        let region = config.options.required_str(kind.as_str(), aws::REGION)?;
        let default_function = config
            .options
            .required_str(kind.as_str(), aws::DEFAULT_LAMBDA_FUNCTION_NAME)?;

        let functions = transports
            .aws_factory(kind)?
            .function_service(&region, dispatch.publish_timeout())
            .map_err(client_construction_error(kind))?;

        Ok(CloudBackend::new(
            alias,
            default_function,
            &config.queues,
            LambdaPublisher::new(functions),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::TaskBackend;
    use crate::config::BackendOptions;
    use crate::messaging::providers::{FailureMode, TransportKind};
    use crate::messaging::InMemoryCloud;
    use crate::models::{TaskInvocation, TaskResultStatus};

    fn build(cloud: &InMemoryCloud) -> LambdaBackend {
        let config = BackendConfig::new(
            BackendKind::Lambda,
            BackendOptions::new()
                .with(aws::REGION, "ap-south-1")
                .with(aws::DEFAULT_LAMBDA_FUNCTION_NAME, "thumbnailer"),
        );
        LambdaBackend::from_config(
            "lambda",
            &config,
            &DispatchConfig::default(),
            &Transports::in_memory(cloud),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_invokes_function_with_payload() {
        let cloud = InMemoryCloud::new();
        let backend = build(&cloud);

        let result = backend
            .enqueue(&TaskInvocation::new("resize").with_kwarg("width", 128))
            .await
            .unwrap();

        assert_eq!(result.status(), TaskResultStatus::Ready);
        assert!(result.id().is_some());
        let published = cloud.published();
        assert_eq!(published[0].transport, TransportKind::Function);
        assert_eq!(published[0].destination, "thumbnailer");
        assert_eq!(
            published[0].body,
            r#"{"task":"resize","args":[],"kwargs":{"width":128}}"#
        );
    }

    #[tokio::test]
    async fn test_missing_request_id_leaves_id_absent() {
        let cloud = InMemoryCloud::new().without_request_ids();
        let backend = build(&cloud);

        let result = backend.enqueue(&TaskInvocation::new("resize")).await.unwrap();
        assert_eq!(result.status(), TaskResultStatus::Ready);
        assert_eq!(result.id(), None);
        assert!(result.enqueued_at().is_some());
    }

    #[tokio::test]
    async fn test_invoke_failure_is_captured() {
        let cloud = InMemoryCloud::new();
        let backend = build(&cloud);
        cloud.fail_publishes_with(Some(FailureMode::Network));

        let result = backend.enqueue(&TaskInvocation::new("resize")).await.unwrap();
        assert_eq!(result.status(), TaskResultStatus::Failed);
        assert_eq!(result.errors().len(), 1);
    }

    #[tokio::test]
    async fn test_close_blocks_further_invokes() {
        let cloud = InMemoryCloud::new();
        let backend = build(&cloud);

        backend.close().await.unwrap();
        assert!(backend.enqueue(&TaskInvocation::new("resize")).await.is_err());
        assert_eq!(cloud.total_calls("Invoke"), 0);
    }

    #[test]
    fn test_fire_and_forget_capabilities() {
        let backend = build(&InMemoryCloud::new());
        assert!(!backend.supports_get_result());
        assert!(!backend.supports_defer());
    }
}
