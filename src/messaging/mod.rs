//! # Messaging Module
//!
//! Transport collaborator boundary: the traits backends publish through, the
//! errors transports report, credential lookup, and an in-memory provider.

pub mod credentials;
pub mod errors;
pub mod providers;
pub mod traits;

pub use credentials::{Credential, CredentialLoader, CredentialRegistry, DefaultCredential};
pub use errors::{BoxError, TransportError, TransportResult};
pub use providers::InMemoryCloud;
pub use traits::*;
