//! # Task Invocation
//!
//! Immutable description of one call: which task, with which arguments, routed
//! where and (optionally) when. An invocation is built per call and dropped
//! after dispatch.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single task call to be dispatched by a backend
///
/// # Example
///
/// ```rust
/// use tasks_cloud::models::TaskInvocation;
///
/// let invocation = TaskInvocation::new("send_email")
///     .with_kwarg("to", "a@example.com")
///     .with_destination("email-ingestor");
///
/// assert_eq!(invocation.name(), "send_email");
/// assert_eq!(invocation.effective_destination("fallback"), "email-ingestor");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInvocation {
    name: String,
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
    #[serde(default)]
    destination_name: Option<String>,
    /// Always an absolute instant; zoned inputs are converted on the way in
    #[serde(default)]
    run_after: Option<DateTime<Utc>>,
}

impl TaskInvocation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            destination_name: None,
            run_after: None,
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_arg(mut self, arg: impl Into<Value>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn with_kwargs(mut self, kwargs: Map<String, Value>) -> Self {
        self.kwargs = kwargs;
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    /// Route to a specific queue/topic/function instead of the backend default
    pub fn with_destination(mut self, destination_name: impl Into<String>) -> Self {
        self.destination_name = Some(destination_name.into());
        self
    }

    /// Defer execution until `run_after`
    ///
    /// Any timezone is accepted; the instant is stored in UTC so the
    /// wall-clock ambiguity of naive timestamps cannot reach a transport.
    pub fn with_run_after<Tz: TimeZone>(mut self, run_after: DateTime<Tz>) -> Self {
        self.run_after = Some(run_after.with_timezone(&Utc));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn kwargs(&self) -> &Map<String, Value> {
        &self.kwargs
    }

    pub fn destination_name(&self) -> Option<&str> {
        self.destination_name.as_deref()
    }

    pub fn run_after(&self) -> Option<DateTime<Utc>> {
        self.run_after
    }

    /// Explicit destination when set and non-empty, else `default`
    pub fn effective_destination<'a>(&'a self, default: &'a str) -> &'a str {
        match self.destination_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => default,
        }
    }

    /// Wire payload for this invocation
    pub fn payload(&self) -> TaskPayload {
        TaskPayload {
            task: self.name.clone(),
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

/// What crosses the transport: exactly `task`, `args` and `kwargs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl TaskPayload {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}
