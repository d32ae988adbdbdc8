//! # Backend Registry
//!
//! Builds one backend per configured alias and hands them out by name.
//!
//! ## Usage
//!
//! ```rust
//! use tasks_cloud::backends::{BackendRegistry, Transports};
//! use tasks_cloud::config::{BackendConfig, BackendKind, BackendOptions, TasksConfig};
//! use tasks_cloud::messaging::InMemoryCloud;
//! use tasks_cloud::models::TaskInvocation;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cloud = InMemoryCloud::with_queues(&["email-ingestor"]);
//! let config = TasksConfig::default().with_backend(
//!     "default",
//!     BackendConfig::new(
//!         BackendKind::Sqs,
//!         BackendOptions::new()
//!             .with("AWS_REGION", "ap-south-1")
//!             .with("AWS_DEFAULT_QUEUE_NAME", "email-ingestor"),
//!     ),
//! );
//!
//! let registry = BackendRegistry::from_config(&config, &Transports::in_memory(&cloud))?;
//! let result = registry
//!     .enqueue("default", &TaskInvocation::new("send_email"))
//!     .await?;
//! assert!(result.is_enqueued());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info, warn};

use super::eventbridge::EventBridgeBackend;
use super::lambda::LambdaBackend;
use super::service_bus::{ServiceBusBackend, ServiceBusEntity};
use super::sns::SnsBackend;
use super::sqs::SqsBackend;
use super::storage_queue::StorageQueueBackend;
use super::transports::Transports;
use super::TaskBackend;
use crate::config::{BackendConfig, BackendKind, ConfigResult, DispatchConfig, TasksConfig};
use crate::error::{DispatchError, DispatchResult};
use crate::models::{TaskInvocation, TaskResult};

/// Alias → backend lookup
#[derive(Debug)]
pub struct BackendRegistry {
    backends: DashMap<String, Arc<dyn TaskBackend>>,
    default_alias: String,
}

impl BackendRegistry {
    /// Empty registry whose default backend is `default_alias`
    pub fn new(default_alias: impl Into<String>) -> Self {
        Self {
            backends: DashMap::new(),
            default_alias: default_alias.into(),
        }
    }

    /// Construct every configured backend; the first failure aborts
    pub fn from_config(config: &TasksConfig, transports: &Transports) -> DispatchResult<Self> {
        config.validate()?;

        let registry = Self::new(config.default_backend.clone());
        let mut aliases: Vec<&String> = config.backends.keys().collect();
        aliases.sort();

        for alias in aliases {
            let backend_config = &config.backends[alias];
            let backend = build_backend(alias, backend_config, &config.dispatch, transports)?;
            registry.register(backend);
        }

        info!(
            backends = registry.len(),
            default_backend = %registry.default_alias,
            "📚 Backend registry initialized"
        );
        Ok(registry)
    }

    /// Add or replace the backend for its alias
    pub fn register(&self, backend: Arc<dyn TaskBackend>) {
        let alias = backend.alias().to_string();
        debug!(alias = %alias, kind = %backend.kind(), "Registered task backend");
        if self.backends.insert(alias.clone(), backend).is_some() {
            warn!(alias = %alias, "Replaced existing task backend");
        }
    }

    pub fn get(&self, alias: &str) -> DispatchResult<Arc<dyn TaskBackend>> {
        self.backends
            .get(alias)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| DispatchError::backend_not_found(alias))
    }

    pub fn default_alias(&self) -> &str {
        &self.default_alias
    }

    pub fn default_backend(&self) -> DispatchResult<Arc<dyn TaskBackend>> {
        self.get(&self.default_alias)
    }

    /// Sorted alias list
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.backends.iter().map(|e| e.key().clone()).collect();
        aliases.sort();
        aliases
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub async fn enqueue(
        &self,
        alias: &str,
        invocation: &TaskInvocation,
    ) -> DispatchResult<TaskResult> {
        let backend = self.get(alias)?;
        backend.enqueue(invocation).await
    }

    /// Close every backend; errors are logged and the remaining backends still close
    pub async fn close_all(&self) {
        let backends: Vec<Arc<dyn TaskBackend>> = self
            .backends
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for backend in backends {
            if let Err(err) = backend.close().await {
                warn!(alias = %backend.alias(), error = %err, "Failed to close task backend");
            }
        }
        info!("🔌 All task backends closed");
    }
}

/// Construct the backend variant selected by `config.backend`
pub fn build_backend(
    alias: &str,
    config: &BackendConfig,
    dispatch: &DispatchConfig,
    transports: &Transports,
) -> ConfigResult<Arc<dyn TaskBackend>> {
    let backend: Arc<dyn TaskBackend> = match config.backend {
        BackendKind::Sqs => Arc::new(SqsBackend::from_config(alias, config, dispatch, transports)?),
        BackendKind::Sns => Arc::new(SnsBackend::from_config(alias, config, dispatch, transports)?),
        BackendKind::EventBridgeScheduler => Arc::new(EventBridgeBackend::from_config(
            alias, config, dispatch, transports,
        )?),
        BackendKind::Lambda => {
            Arc::new(LambdaBackend::from_config(alias, config, dispatch, transports)?)
        }
        BackendKind::ServiceBusQueue => Arc::new(ServiceBusBackend::from_config(
            alias,
            ServiceBusEntity::Queue,
            config,
            dispatch,
            transports,
        )?),
        BackendKind::ServiceBusTopic => Arc::new(ServiceBusBackend::from_config(
            alias,
            ServiceBusEntity::Topic,
            config,
            dispatch,
            transports,
        )?),
        BackendKind::StorageQueue => Arc::new(StorageQueueBackend::from_config(
            alias, config, dispatch, transports,
        )?),
    };
    Ok(backend)
}
