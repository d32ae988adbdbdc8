//! Backend configuration builders shared by the integration suites.

use std::sync::Arc;

use tasks_cloud::backends::{build_backend, Transports};
use tasks_cloud::config::{BackendConfig, BackendKind, BackendOptions, DispatchConfig};
use tasks_cloud::constants::{aws, service_bus, storage_queue};
use tasks_cloud::messaging::InMemoryCloud;
use tasks_cloud::TaskBackend;

pub const REGION: &str = "ap-south-1";
pub const SNS_PREFIX: &str = "arn:aws:sns:ap-south-1:123456789012:";
pub const SCHEDULER_ROLE: &str = "arn:aws:iam::123456789012:role/scheduler";

pub fn sqs_config(default_queue: &str) -> BackendConfig {
    BackendConfig::new(
        BackendKind::Sqs,
        BackendOptions::new()
            .with(aws::REGION, REGION)
            .with(aws::DEFAULT_QUEUE_NAME, default_queue),
    )
}

pub fn sns_config(default_topic: &str) -> BackendConfig {
    BackendConfig::new(
        BackendKind::Sns,
        BackendOptions::new()
            .with(aws::REGION, REGION)
            .with(aws::DEFAULT_TOPIC_NAME, default_topic)
            .with(aws::SNS_ARN_PREFIX, SNS_PREFIX),
    )
}

pub fn scheduler_config(default_queue: &str) -> BackendConfig {
    BackendConfig::new(
        BackendKind::EventBridgeScheduler,
        BackendOptions::new()
            .with(aws::REGION, REGION)
            .with(aws::DEFAULT_SQS_QUEUE_NAME, default_queue)
            .with(aws::SCHEDULER_ROLE_ARN, SCHEDULER_ROLE),
    )
}

pub fn lambda_config(default_function: &str) -> BackendConfig {
    BackendConfig::new(
        BackendKind::Lambda,
        BackendOptions::new()
            .with(aws::REGION, REGION)
            .with(aws::DEFAULT_LAMBDA_FUNCTION_NAME, default_function),
    )
}

pub fn service_bus_queue_config(default_queue: &str) -> BackendConfig {
    BackendConfig::new(
        BackendKind::ServiceBusQueue,
        BackendOptions::new()
            .with(service_bus::DEFAULT_QUEUE_NAME, default_queue)
            .with(service_bus::CONNECTION_STRING, "Endpoint=sb://demo.servicebus.windows.net/"),
    )
}

pub fn storage_queue_config(default_queue: &str) -> BackendConfig {
    BackendConfig::new(
        BackendKind::StorageQueue,
        BackendOptions::new()
            .with(storage_queue::DEFAULT_QUEUE_NAME, default_queue)
            .with(storage_queue::CONNECTION_STRING, "AccountName=demo"),
    )
}

/// Build a backend for `config` wired to `cloud`
pub fn backend_for(alias: &str, config: &BackendConfig, cloud: &InMemoryCloud) -> Arc<dyn TaskBackend> {
    build_backend(
        alias,
        config,
        &DispatchConfig::default(),
        &Transports::in_memory(cloud),
    )
    .expect("backend configuration is complete")
}
