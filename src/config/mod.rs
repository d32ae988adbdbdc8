//! # Backend Configuration
//!
//! Per-alias backend settings, laid out like the host framework's task settings:
//!
//! ```toml
//! default_backend = "sqs"
//!
//! [dispatch]
//! publish_timeout_seconds = 5
//!
//! [backends.sqs]
//! backend = "sqs"
//! queues = ["email-ingestor"]
//!
//! [backends.sqs.options]
//! AWS_REGION = "ap-south-1"
//! AWS_DEFAULT_QUEUE_NAME = "email-ingestor"
//! ```
//!
//! Option keys are case-insensitive. Values may be strings, booleans or numbers;
//! an empty string is treated the same as an absent key.

pub mod error;
pub mod loader;

use crate::constants::{
    DEFAULT_BACKEND_ALIAS, DEFAULT_PUBLISH_TIMEOUT_SECONDS, DEFAULT_SCHEDULE_NAME_PREFIX,
    SENSITIVE_OPTION_PATTERNS,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigLoader;

/// Transport variant a backend alias is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    #[serde(rename = "sqs")]
    Sqs,
    #[serde(rename = "sns")]
    Sns,
    #[serde(rename = "eventbridge_scheduler")]
    EventBridgeScheduler,
    #[serde(rename = "lambda")]
    Lambda,
    #[serde(rename = "service_bus_queue")]
    ServiceBusQueue,
    #[serde(rename = "service_bus_topic")]
    ServiceBusTopic,
    #[serde(rename = "storage_queue")]
    StorageQueue,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sqs => "sqs",
            Self::Sns => "sns",
            Self::EventBridgeScheduler => "eventbridge_scheduler",
            Self::Lambda => "lambda",
            Self::ServiceBusQueue => "service_bus_queue",
            Self::ServiceBusTopic => "service_bus_topic",
            Self::StorageQueue => "storage_queue",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqs" => Ok(Self::Sqs),
            "sns" => Ok(Self::Sns),
            "eventbridge_scheduler" => Ok(Self::EventBridgeScheduler),
            "lambda" => Ok(Self::Lambda),
            "service_bus_queue" => Ok(Self::ServiceBusQueue),
            "service_bus_topic" => Ok(Self::ServiceBusTopic),
            "storage_queue" => Ok(Self::StorageQueue),
            other => Err(ConfigurationError::UnknownBackendKind {
                value: other.to_string(),
            }),
        }
    }
}

/// Option map for one backend alias
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "HashMap<String, Value>", into = "HashMap<String, Value>")]
pub struct BackendOptions {
    values: HashMap<String, Value>,
}

impl From<HashMap<String, Value>> for BackendOptions {
    fn from(values: HashMap<String, Value>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(key, value)| (key.to_ascii_uppercase(), value))
                .collect(),
        }
    }
}

impl From<BackendOptions> for HashMap<String, Value> {
    fn from(options: BackendOptions) -> Self {
        options.values
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for BackendOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect::<HashMap<String, Value>>()
            .into()
    }
}

impl BackendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values
            .insert(key.into().to_ascii_uppercase(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Non-empty string value, or `None` when absent/empty/null
    pub fn optional_str(&self, key: &str) -> Option<String> {
        match self.values.get(&key.to_ascii_uppercase())? {
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Non-empty string value; fails naming the missing key
    pub fn required_str(&self, backend: &str, key: &str) -> ConfigResult<String> {
        self.optional_str(key)
            .ok_or_else(|| ConfigurationError::missing_option(backend, key))
    }

    /// Boolean flag that also accepts "true"/"false"/"1"/"0"/"yes"/"no"
    pub fn bool_or(&self, backend: &str, key: &str, default: bool) -> ConfigResult<bool> {
        match self.values.get(&key.to_ascii_uppercase()) {
            None | Some(Value::Null) => Ok(default),
            Some(Value::Bool(b)) => Ok(*b),
            Some(Value::String(s)) if s.is_empty() => Ok(default),
            Some(Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(true),
                "false" | "0" | "no" => Ok(false),
                _ => Err(ConfigurationError::invalid_option(
                    backend,
                    key,
                    format!("expected a boolean, got '{s}'"),
                )),
            },
            Some(Value::Number(n)) => Ok(n.as_i64().is_some_and(|n| n != 0)),
            Some(other) => Err(ConfigurationError::invalid_option(
                backend,
                key,
                format!("expected a boolean, got {other}"),
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Options rendered for logs with secrets masked
    pub fn sanitized(&self) -> serde_json::Map<String, Value> {
        self.values
            .iter()
            .map(|(key, value)| {
                let sensitive = SENSITIVE_OPTION_PATTERNS
                    .iter()
                    .any(|pattern| key.contains(pattern));
                let rendered = if sensitive && !value.is_null() {
                    Value::String("[MASKED]".to_string())
                } else {
                    value.clone()
                };
                (key.clone(), rendered)
            })
            .collect()
    }
}

/// Settings for one backend alias
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    pub backend: BackendKind,
    /// Destinations an invocation may target; empty allows any
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default)]
    pub options: BackendOptions,
}

impl BackendConfig {
    pub fn new(backend: BackendKind, options: BackendOptions) -> Self {
        Self {
            backend,
            queues: Vec::new(),
            options,
        }
    }

    pub fn with_queues<I, S>(mut self, queues: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.queues = queues.into_iter().map(Into::into).collect();
        self
    }
}

/// Settings shared by every backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_publish_timeout_seconds")]
    pub publish_timeout_seconds: u64,
    #[serde(default = "default_schedule_name_prefix")]
    pub schedule_name_prefix: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            publish_timeout_seconds: DEFAULT_PUBLISH_TIMEOUT_SECONDS,
            schedule_name_prefix: DEFAULT_SCHEDULE_NAME_PREFIX.to_string(),
        }
    }
}

impl DispatchConfig {
    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_seconds)
    }
}

fn default_publish_timeout_seconds() -> u64 {
    DEFAULT_PUBLISH_TIMEOUT_SECONDS
}

fn default_schedule_name_prefix() -> String {
    DEFAULT_SCHEDULE_NAME_PREFIX.to_string()
}

fn default_backend_alias() -> String {
    DEFAULT_BACKEND_ALIAS.to_string()
}

/// Root configuration: every backend alias plus shared dispatch settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "default_backend_alias")]
    pub default_backend: String,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub backends: HashMap<String, BackendConfig>,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_backend: default_backend_alias(),
            dispatch: DispatchConfig::default(),
            backends: HashMap::new(),
        }
    }
}

impl TasksConfig {
    pub fn with_backend(mut self, alias: impl Into<String>, backend: BackendConfig) -> Self {
        self.backends.insert(alias.into(), backend);
        self
    }

    pub fn with_default_backend(mut self, alias: impl Into<String>) -> Self {
        self.default_backend = alias.into();
        self
    }

    /// Structural checks that do not depend on any particular backend kind
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dispatch.publish_timeout_seconds == 0 {
            return Err(ConfigurationError::invalid_option(
                "dispatch",
                "publish_timeout_seconds",
                "must be greater than zero",
            ));
        }

        let prefix = &self.dispatch.schedule_name_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(ConfigurationError::invalid_option(
                "dispatch",
                "schedule_name_prefix",
                "must be non-empty and contain only [0-9A-Za-z-_.]",
            ));
        }

        Ok(())
    }

    /// Configuration rendered for logs with secrets masked
    pub fn sanitized(&self) -> Value {
        let backends: serde_json::Map<String, Value> = self
            .backends
            .iter()
            .map(|(alias, backend)| {
                (
                    alias.clone(),
                    serde_json::json!({
                        "backend": backend.backend.as_str(),
                        "queues": backend.queues,
                        "options": backend.options.sanitized(),
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "default_backend": self.default_backend,
            "dispatch": {
                "publish_timeout_seconds": self.dispatch.publish_timeout_seconds,
                "schedule_name_prefix": self.dispatch.schedule_name_prefix,
            },
            "backends": backends,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_option_keys_are_case_insensitive() {
        let options = BackendOptions::new().with("aws_region", "eu-west-1");
        assert_eq!(options.optional_str("AWS_REGION").as_deref(), Some("eu-west-1"));
        assert_eq!(options.optional_str("aws_region").as_deref(), Some("eu-west-1"));
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let options = BackendOptions::new()
            .with("AWS_REGION", "")
            .with("AWS_DEFAULT_QUEUE_NAME", Value::Null);

        let err = options.required_str("sqs", "AWS_REGION").unwrap_err();
        assert_eq!(err, ConfigurationError::missing_option("sqs", "AWS_REGION"));
        assert!(options.optional_str("AWS_DEFAULT_QUEUE_NAME").is_none());
    }

    #[test]
    fn test_bool_parsing() {
        let options = BackendOptions::new()
            .with("A", true)
            .with("B", "false")
            .with("C", "TRUE")
            .with("D", "maybe");

        assert!(options.bool_or("x", "A", false).unwrap());
        assert!(!options.bool_or("x", "B", true).unwrap());
        assert!(options.bool_or("x", "C", false).unwrap());
        assert!(options.bool_or("x", "MISSING", true).unwrap());
        assert!(matches!(
            options.bool_or("x", "D", true),
            Err(ConfigurationError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_sanitized_masks_secrets() {
        let options = BackendOptions::new()
            .with("SERVICEBUS_CONNECTION_STRING", "Endpoint=sb://x;SharedAccessKey=abc")
            .with("SERVICEBUS_DEFAULT_QUEUE_NAME", "orders");

        let sanitized = options.sanitized();
        assert_eq!(sanitized["SERVICEBUS_CONNECTION_STRING"], json!("[MASKED]"));
        assert_eq!(sanitized["SERVICEBUS_DEFAULT_QUEUE_NAME"], json!("orders"));
    }

    #[test]
    fn test_backend_kind_parsing() {
        assert_eq!("SQS".parse::<BackendKind>().unwrap(), BackendKind::Sqs);
        assert_eq!(
            "eventbridge_scheduler".parse::<BackendKind>().unwrap(),
            BackendKind::EventBridgeScheduler
        );
        assert!(matches!(
            "kafka".parse::<BackendKind>(),
            Err(ConfigurationError::UnknownBackendKind { .. })
        ));
    }

    #[test]
    fn test_backend_config_deserializes_from_json() {
        let raw = json!({
            "backend": "service_bus_topic",
            "queues": ["events"],
            "options": {"servicebus_default_topic_name": "events"}
        });

        let config: BackendConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.backend, BackendKind::ServiceBusTopic);
        assert_eq!(config.queues, vec!["events".to_string()]);
        assert_eq!(
            config.options.optional_str("SERVICEBUS_DEFAULT_TOPIC_NAME").as_deref(),
            Some("events")
        );
    }

    #[test]
    fn test_validate_rejects_bad_dispatch_settings() {
        let mut config = TasksConfig::default();
        assert!(config.validate().is_ok());

        config.dispatch.publish_timeout_seconds = 0;
        assert!(config.validate().is_err());

        config.dispatch.publish_timeout_seconds = 5;
        config.dispatch.schedule_name_prefix = "bad prefix".to_string();
        assert!(config.validate().is_err());
    }
}
