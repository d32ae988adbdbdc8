//! Invocation validation performed before any transport call
//!
//! Rejections surface as [`DispatchError::InvalidTask`] and never reach the
//! result record: a malformed invocation is a caller error, not a dispatch outcome.

use std::collections::HashSet;

use crate::error::{DispatchError, DispatchResult};
use crate::models::TaskInvocation;

/// Per-backend invocation checks
#[derive(Debug, Clone, Default)]
pub struct TaskValidator {
    supports_defer: bool,
    /// Empty allows any destination
    allowed_destinations: HashSet<String>,
}

impl TaskValidator {
    pub fn new(supports_defer: bool) -> Self {
        Self {
            supports_defer,
            allowed_destinations: HashSet::new(),
        }
    }

    pub fn with_allowed_destinations<I, S>(mut self, destinations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_destinations = destinations.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows_destination(&self, destination: &str) -> bool {
        self.allowed_destinations.is_empty() || self.allowed_destinations.contains(destination)
    }

    /// Check `invocation` as it would be dispatched to `destination`
    pub fn validate(&self, invocation: &TaskInvocation, destination: &str) -> DispatchResult<()> {
        if invocation.name().trim().is_empty() {
            return Err(DispatchError::invalid_task("task name must not be empty"));
        }

        if invocation.run_after().is_some() && !self.supports_defer {
            return Err(DispatchError::invalid_task(format!(
                "task '{}' has run_after set but the backend does not support deferred tasks",
                invocation.name()
            )));
        }

        if !self.allows_destination(destination) {
            return Err(DispatchError::invalid_task(format!(
                "destination '{}' is not in the backend's allowed queues",
                destination
            )));
        }

        Ok(())
    }
}
