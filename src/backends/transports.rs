//! Transport client factories handed to backend constructors.

use std::fmt;
use std::sync::Arc;

use crate::config::{BackendKind, ConfigResult, ConfigurationError};
use crate::messaging::{
    AwsClientFactory, ClientFactory, CredentialRegistry, InMemoryCloud, ServiceBusClient,
    StorageQueueService, TransportError,
};

/// Client factories and credential loaders available to backends
///
/// A backend kind whose factory is absent fails construction with
/// [`ConfigurationError::ClientConstruction`].
#[derive(Clone, Default)]
pub struct Transports {
    pub aws: Option<Arc<dyn AwsClientFactory>>,
    pub service_bus: Option<Arc<dyn ClientFactory<dyn ServiceBusClient>>>,
    pub storage_queue: Option<Arc<dyn ClientFactory<dyn StorageQueueService>>>,
    pub credentials: CredentialRegistry,
}

impl fmt::Debug for Transports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transports")
            .field("aws", &self.aws.is_some())
            .field("service_bus", &self.service_bus.is_some())
            .field("storage_queue", &self.storage_queue.is_some())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl Transports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every factory backed by the same in-memory cloud
    pub fn in_memory(cloud: &InMemoryCloud) -> Self {
        Self {
            aws: Some(Arc::new(cloud.clone())),
            service_bus: Some(Arc::new(cloud.clone())),
            storage_queue: Some(Arc::new(cloud.clone())),
            credentials: CredentialRegistry::new(),
        }
    }

    pub fn with_aws(mut self, factory: Arc<dyn AwsClientFactory>) -> Self {
        self.aws = Some(factory);
        self
    }

    pub fn with_service_bus(mut self, factory: Arc<dyn ClientFactory<dyn ServiceBusClient>>) -> Self {
        self.service_bus = Some(factory);
        self
    }

    pub fn with_storage_queue(
        mut self,
        factory: Arc<dyn ClientFactory<dyn StorageQueueService>>,
    ) -> Self {
        self.storage_queue = Some(factory);
        self
    }

    pub fn with_credentials(mut self, credentials: CredentialRegistry) -> Self {
        self.credentials = credentials;
        self
    }

    pub(crate) fn aws_factory(&self, kind: BackendKind) -> ConfigResult<&Arc<dyn AwsClientFactory>> {
        self.aws
            .as_ref()
            .ok_or_else(|| missing_factory(kind, "AWS"))
    }

    pub(crate) fn service_bus_factory(
        &self,
        kind: BackendKind,
    ) -> ConfigResult<&Arc<dyn ClientFactory<dyn ServiceBusClient>>> {
        self.service_bus
            .as_ref()
            .ok_or_else(|| missing_factory(kind, "Service Bus"))
    }

    pub(crate) fn storage_queue_factory(
        &self,
        kind: BackendKind,
    ) -> ConfigResult<&Arc<dyn ClientFactory<dyn StorageQueueService>>> {
        self.storage_queue
            .as_ref()
            .ok_or_else(|| missing_factory(kind, "Storage Account queue"))
    }
}

/// Maps a client factory failure onto a configuration error for `kind`
pub(crate) fn client_construction_error(
    kind: BackendKind,
) -> impl FnOnce(TransportError) -> ConfigurationError {
    move |err| ConfigurationError::client_construction(kind.as_str(), err.to_string())
}

fn missing_factory(kind: BackendKind, family: &str) -> ConfigurationError {
    ConfigurationError::client_construction(
        kind.as_str(),
        format!("no {family} client factory registered"),
    )
}
