#![allow(clippy::doc_markdown)] // Allow technical terms like EventBridge, SQS in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Tasks Cloud
//!
//! Task enqueuing backends that hand work to cloud transports: simple queues,
//! pub/sub topics, one-shot schedulers, serverless functions, Service Bus
//! queues and topics, and storage queues.
//!
//! ## Overview
//!
//! Application code builds a [`TaskInvocation`] and calls `enqueue` on a backend.
//! The backend serializes `{task, args, kwargs}`, publishes it once, and returns a
//! [`TaskResult`]. Transport failures never escape `enqueue`: they come back as a
//! `FAILED` record carrying a normalized [`TaskError`], so batch producers can
//! keep going without per-item error handling.
//!
//! ## Module Organization
//!
//! - [`backends`] - Backend contract, shared dispatch orchestration, per-transport publishers, registry
//! - [`models`] - Invocation and result record types, including the frozen-field guard
//! - [`messaging`] - Transport collaborator traits, transport errors, credentials, in-memory cloud
//! - [`config`] - Per-alias backend configuration and file/environment loading
//! - [`results`] - Result persistence with the frozen-field guard at the storage boundary
//! - [`validation`] - Invocation checks performed before dispatch
//! - [`logging`] - Structured logging setup and dispatch log events
//!
//! ## Quick Start
//!
//! ```rust
//! use tasks_cloud::backends::{SqsBackend, TaskBackend, Transports};
//! use tasks_cloud::config::{BackendConfig, BackendKind, BackendOptions, DispatchConfig};
//! use tasks_cloud::messaging::InMemoryCloud;
//! use tasks_cloud::models::{TaskInvocation, TaskResultStatus};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cloud = InMemoryCloud::with_queues(&["email-ingestor"]);
//! let config = BackendConfig::new(
//!     BackendKind::Sqs,
//!     BackendOptions::new()
//!         .with("AWS_REGION", "ap-south-1")
//!         .with("AWS_DEFAULT_QUEUE_NAME", "email-ingestor"),
//! );
//! let backend = SqsBackend::from_config(
//!     "default",
//!     &config,
//!     &DispatchConfig::default(),
//!     &Transports::in_memory(&cloud),
//! )?;
//!
//! let result = backend
//!     .enqueue(&TaskInvocation::new("send_email").with_kwarg("to", "a@example.com"))
//!     .await?;
//! assert_eq!(result.status(), TaskResultStatus::Ready);
//! assert!(result.id().is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod results;
pub mod validation;

pub use backends::{BackendRegistry, CloudBackend, TaskBackend, Transports};
pub use config::{
    BackendConfig, BackendKind, BackendOptions, ConfigLoader, ConfigurationError, DispatchConfig,
    TasksConfig,
};
pub use error::{DispatchError, DispatchResult};
pub use logging::init_structured_logging;
pub use messaging::{InMemoryCloud, TransportError};
pub use models::{
    FrozenField, FrozenFieldError, TaskError, TaskInvocation, TaskPayload, TaskResult,
    TaskResultStatus,
};
pub use results::{InMemoryResultStore, StoredResult, TaskResultStore};
pub use validation::TaskValidator;
