//! # Models
//!
//! Value types that flow through a dispatch: the invocation a caller builds and
//! the result record a backend hands back.

pub mod invocation;
pub mod task_result;

pub use invocation::{TaskInvocation, TaskPayload};
pub use task_result::{FrozenField, FrozenFieldError, TaskError, TaskResult, TaskResultStatus};
