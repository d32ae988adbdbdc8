//! # Task Result Record
//!
//! Lifecycle record describing the outcome of one dispatch attempt.
//!
//! ## Write paths
//!
//! There are two distinct ways to change a record:
//!
//! - **Trusted construction** (`ready`, `enqueued`, `failed`): used by the dispatch
//!   orchestrator. Each call consumes the record and returns a new value with the
//!   dispatch facts set. No guard runs because the orchestrator is the author of
//!   those facts.
//! - **Guarded setters** (`set_id`, `set_enqueued_at`, `set_args`, `set_kwargs`):
//!   for everything else, including worker processes and result stores. Once a
//!   frozen field holds a non-empty value it can only be "set" to the same value.
//!
//! Lifecycle fields (`status`, `started_at`, `last_attempted_at`, `finished_at`,
//! `errors`, `worker_ids`) are never frozen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Status of a task result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskResultStatus {
    /// Dispatched (or about to be) and waiting for a worker
    Ready,
    Running,
    Failed,
    Successful,
}

impl fmt::Display for TaskResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Failed => "FAILED",
            Self::Successful => "SUCCESSFUL",
        };
        f.write_str(label)
    }
}

/// Backend-agnostic failure signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    pub exception_class_path: String,
    pub traceback: String,
}

impl TaskError {
    pub fn new(exception_class_path: impl Into<String>, traceback: impl Into<String>) -> Self {
        Self {
            exception_class_path: exception_class_path.into(),
            traceback: traceback.into(),
        }
    }
}

/// Fields that cannot change once populated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrozenField {
    Id,
    EnqueuedAt,
    Args,
    Kwargs,
}

impl FrozenField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::EnqueuedAt => "enqueued_at",
            Self::Args => "args",
            Self::Kwargs => "kwargs",
        }
    }
}

impl fmt::Display for FrozenField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Frozen: {field}")]
pub struct FrozenFieldError {
    pub field: FrozenField,
}

impl FrozenFieldError {
    pub fn new(field: FrozenField) -> Self {
        Self { field }
    }
}

/// Outcome record returned by every `enqueue`
///
/// # Example
///
/// ```rust
/// use tasks_cloud::models::{TaskResult, TaskResultStatus};
///
/// let mut result = TaskResult::ready("send_email", vec![], Default::default(), "sqs");
/// assert_eq!(result.status(), TaskResultStatus::Ready);
///
/// result.set_id("m1").unwrap();
/// assert!(result.set_id("m1").is_ok());
/// assert!(result.set_id("m2").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    id: Option<String>,
    task_name: String,
    status: TaskResultStatus,
    enqueued_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    last_attempted_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    args: Vec<Value>,
    kwargs: Map<String, Value>,
    backend: String,
    errors: Vec<TaskError>,
    worker_ids: Vec<String>,
}

impl TaskResult {
    /// Initial record: `READY`, no id, no timestamps, no errors
    pub fn ready(
        task_name: impl Into<String>,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
        backend: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            task_name: task_name.into(),
            status: TaskResultStatus::Ready,
            enqueued_at: None,
            started_at: None,
            last_attempted_at: None,
            finished_at: None,
            args,
            kwargs,
            backend: backend.into(),
            errors: Vec::new(),
            worker_ids: Vec::new(),
        }
    }

    /// Successful publish: record the transport id and publish time
    pub(crate) fn enqueued(self, id: Option<String>, enqueued_at: DateTime<Utc>) -> Self {
        Self {
            id: id.filter(|id| !id.is_empty()),
            enqueued_at: Some(enqueued_at),
            ..self
        }
    }

    /// Failed publish: append the captured error and mark `FAILED`
    pub(crate) fn failed(mut self, error: TaskError) -> Self {
        self.errors.push(error);
        Self {
            status: TaskResultStatus::Failed,
            ..self
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn task_name(&self) -> &str {
        &self.task_name
    }

    pub fn status(&self) -> TaskResultStatus {
        self.status
    }

    pub fn enqueued_at(&self) -> Option<DateTime<Utc>> {
        self.enqueued_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn last_attempted_at(&self) -> Option<DateTime<Utc>> {
        self.last_attempted_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn errors(&self) -> &[TaskError] {
        &self.errors
    }

    pub fn worker_ids(&self) -> &[String] {
        &self.worker_ids
    }

    /// Published and not failed
    pub fn is_enqueued(&self) -> bool {
        self.status != TaskResultStatus::Failed && self.enqueued_at.is_some()
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> Result<(), FrozenFieldError> {
        let id = id.into();
        guard(FrozenField::Id, id_is_set(&self.id), self.id.as_deref() == Some(&id))?;
        self.id = Some(id);
        Ok(())
    }

    pub fn set_enqueued_at(&mut self, enqueued_at: DateTime<Utc>) -> Result<(), FrozenFieldError> {
        guard(
            FrozenField::EnqueuedAt,
            self.enqueued_at.is_some(),
            self.enqueued_at == Some(enqueued_at),
        )?;
        self.enqueued_at = Some(enqueued_at);
        Ok(())
    }

    pub fn set_args(&mut self, args: Vec<Value>) -> Result<(), FrozenFieldError> {
        guard(FrozenField::Args, !self.args.is_empty(), self.args == args)?;
        self.args = args;
        Ok(())
    }

    pub fn set_kwargs(&mut self, kwargs: Map<String, Value>) -> Result<(), FrozenFieldError> {
        guard(FrozenField::Kwargs, !self.kwargs.is_empty(), self.kwargs == kwargs)?;
        self.kwargs = kwargs;
        Ok(())
    }

    pub fn set_status(&mut self, status: TaskResultStatus) {
        self.status = status;
    }

    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        self.started_at = Some(at);
        self.status = TaskResultStatus::Running;
    }

    pub fn mark_attempted(&mut self, at: DateTime<Utc>) {
        self.last_attempted_at = Some(at);
    }

    /// Terminal transition; `FAILED` when any error has been recorded
    pub fn mark_finished(&mut self, at: DateTime<Utc>) {
        self.finished_at = Some(at);
        self.status = if self.errors.is_empty() {
            TaskResultStatus::Successful
        } else {
            TaskResultStatus::Failed
        };
    }

    pub fn push_error(&mut self, error: TaskError) {
        self.errors.push(error);
    }

    pub fn push_worker_id(&mut self, worker_id: impl Into<String>) {
        self.worker_ids.push(worker_id.into());
    }

    /// Verify this record may replace `previous` in persistent storage
    ///
    /// Every frozen field that is non-empty on `previous` must be unchanged.
    pub fn check_frozen_against(&self, previous: &TaskResult) -> Result<(), FrozenFieldError> {
        guard(FrozenField::Id, id_is_set(&previous.id), self.id == previous.id)?;
        guard(
            FrozenField::EnqueuedAt,
            previous.enqueued_at.is_some(),
            self.enqueued_at == previous.enqueued_at,
        )?;
        guard(FrozenField::Args, !previous.args.is_empty(), self.args == previous.args)?;
        guard(
            FrozenField::Kwargs,
            !previous.kwargs.is_empty(),
            self.kwargs == previous.kwargs,
        )
    }
}

fn id_is_set(id: &Option<String>) -> bool {
    id.as_deref().is_some_and(|id| !id.is_empty())
}

fn guard(field: FrozenField, previously_set: bool, unchanged: bool) -> Result<(), FrozenFieldError> {
    if previously_set && !unchanged {
        return Err(FrozenFieldError::new(field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn ready_result() -> TaskResult {
        TaskResult::ready("send_email", vec![], Map::new(), "sqs")
    }

    #[test]
    fn test_ready_record_has_no_dispatch_facts() {
        let result = ready_result();
        assert_eq!(result.status(), TaskResultStatus::Ready);
        assert_eq!(result.id(), None);
        assert_eq!(result.enqueued_at(), None);
        assert_eq!(result.started_at(), None);
        assert!(result.errors().is_empty());
        assert!(result.worker_ids().is_empty());
        assert!(!result.is_enqueued());
    }

    #[test]
    fn test_set_id_freezes_after_first_write() {
        let mut result = ready_result();

        result.set_id("m1").expect("first write succeeds");
        result.set_id("m1").expect("same value succeeds");

        let err = result.set_id("m2").unwrap_err();
        assert_eq!(err.field, FrozenField::Id);
        assert_eq!(err.to_string(), "Frozen: id");
        assert_eq!(result.id(), Some("m1"));
    }

    #[test]
    fn test_enqueued_constructor_sets_id_and_time() {
        let now = Utc::now();
        let result = ready_result().enqueued(Some("abc".to_string()), now);

        assert_eq!(result.id(), Some("abc"));
        assert_eq!(result.enqueued_at(), Some(now));
        assert_eq!(result.status(), TaskResultStatus::Ready);
        assert!(result.is_enqueued());
    }

    #[test]
    fn test_enqueued_with_empty_id_stays_absent() {
        let result = ready_result().enqueued(Some(String::new()), Utc::now());
        assert_eq!(result.id(), None);

        let mut result = result;
        result.set_id("late").expect("empty id is not frozen");
    }

    #[test]
    fn test_failed_constructor_appends_error() {
        let result = ready_result().failed(TaskError::new("x::Boom", "trace"));

        assert_eq!(result.status(), TaskResultStatus::Failed);
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].exception_class_path, "x::Boom");
        assert!(!result.is_enqueued());
    }

    #[test]
    fn test_enqueued_at_args_kwargs_are_frozen() {
        let at = Utc::now();
        let mut result = TaskResult::ready("t", vec![json!(1)], Map::new(), "sqs").enqueued(None, at);

        assert!(result.set_enqueued_at(at).is_ok());
        assert_eq!(
            result.set_enqueued_at(at + Duration::seconds(1)).unwrap_err().field,
            FrozenField::EnqueuedAt
        );

        assert!(result.set_args(vec![json!(1)]).is_ok());
        assert_eq!(result.set_args(vec![json!(2)]).unwrap_err().field, FrozenField::Args);

        let mut kwargs = Map::new();
        kwargs.insert("a".to_string(), json!(true));
        result.set_kwargs(kwargs.clone()).expect("empty kwargs accept first write");
        assert!(result.set_kwargs(kwargs).is_ok());
        assert_eq!(result.set_kwargs(Map::new()).unwrap_err().field, FrozenField::Kwargs);
    }

    #[test]
    fn test_lifecycle_fields_are_not_frozen() {
        let mut result = ready_result().enqueued(Some("m1".to_string()), Utc::now());
        let started = Utc::now();

        result.mark_started(started);
        assert_eq!(result.status(), TaskResultStatus::Running);
        result.mark_attempted(started);
        result.mark_attempted(started + Duration::seconds(5));
        result.push_worker_id("worker-1");
        result.mark_finished(started + Duration::seconds(10));

        assert_eq!(result.status(), TaskResultStatus::Successful);
        assert_eq!(result.last_attempted_at(), Some(started + Duration::seconds(5)));
        assert_eq!(result.worker_ids(), ["worker-1".to_string()]);

        result.push_error(TaskError::new("w::Crash", ""));
        result.mark_finished(started + Duration::seconds(11));
        assert_eq!(result.status(), TaskResultStatus::Failed);
    }

    #[test]
    fn test_check_frozen_against_previous() {
        let previous = ready_result().enqueued(Some("m1".to_string()), Utc::now());

        let mut same = previous.clone();
        same.mark_started(Utc::now());
        assert!(same.check_frozen_against(&previous).is_ok());

        let overwritten = ready_result().enqueued(Some("m2".to_string()), Utc::now());
        assert_eq!(
            overwritten.check_frozen_against(&previous).unwrap_err().field,
            FrozenField::Id
        );

        let unset = ready_result();
        assert!(previous.check_frozen_against(&unset).is_ok());
    }

    #[test]
    fn test_status_serializes_in_upper_case() {
        let encoded = serde_json::to_string(&TaskResultStatus::Successful).unwrap();
        assert_eq!(encoded, "\"SUCCESSFUL\"");
        assert_eq!(TaskResultStatus::Failed.to_string(), "FAILED");
    }
}
