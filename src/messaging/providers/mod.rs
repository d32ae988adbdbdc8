//! # Messaging Providers
//!
//! Transport implementations shipped with the crate.

pub mod in_memory;

pub use in_memory::{
    ConnectionMethod, ConnectionRecord, FailureMode, InMemoryCloud, PublishedMessage,
    TransportKind,
};
