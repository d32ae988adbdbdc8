//! Configuration Loader
//!
//! Layers an optional settings file under environment variable overrides and
//! deserializes the result into [`TasksConfig`].
//!
//! Environment variables use the prefix `TASKS`, `_` after the prefix and `__`
//! between nested keys:
//!
//! ```text
//! TASKS_DEFAULT_BACKEND=sqs
//! TASKS_BACKENDS__SQS__BACKEND=sqs
//! TASKS_BACKENDS__SQS__OPTIONS__AWS_REGION=ap-south-1
//! ```

use super::error::ConfigResult;
use super::TasksConfig;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

const DEFAULT_ENV_PREFIX: &str = "TASKS";

/// Builds a [`TasksConfig`] from a file and the process environment
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            file: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        }
    }

    /// Settings file; format is chosen by extension (toml, yaml, json)
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Use `TASKS_CONFIG_PATH` as the settings file when it is set
    pub fn from_env() -> Self {
        let loader = Self::new();
        match env::var("TASKS_CONFIG_PATH") {
            Ok(path) if !path.is_empty() => loader.with_file(path),
            _ => loader,
        }
    }

    pub fn load(&self) -> ConfigResult<TasksConfig> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = &self.file {
            debug!("Loading task backend configuration from {}", path.display());
            builder = builder.add_source(::config::File::from(path.as_path()).required(true));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: TasksConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            "Task backend configuration loaded: {}",
            serde_json::to_string(&config.sanitized())
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, ConfigurationError};
    use std::io::Write;

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            r#"
default_backend = "sqs"

[dispatch]
publish_timeout_seconds = 10

[backends.sqs]
backend = "sqs"
queues = ["email-ingestor"]

[backends.sqs.options]
AWS_REGION = "ap-south-1"
AWS_DEFAULT_QUEUE_NAME = "email-ingestor"
"#
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_env_prefix("TASKS_LOADER_TEST_TOML")
            .with_file(file.path())
            .load()
            .expect("config loads");

        assert_eq!(config.default_backend, "sqs");
        assert_eq!(config.dispatch.publish_timeout_seconds, 10);
        assert_eq!(config.dispatch.schedule_name_prefix, "task");

        let sqs = &config.backends["sqs"];
        assert_eq!(sqs.backend, BackendKind::Sqs);
        assert_eq!(sqs.queues, vec!["email-ingestor".to_string()]);
        assert_eq!(sqs.options.optional_str("AWS_REGION").as_deref(), Some("ap-south-1"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("temp file");
        write!(
            file,
            r#"{{"backends": {{"lambda": {{"backend": "lambda", "options": {{"aws_region": "us-east-1"}}}}}}}}"#
        )
        .unwrap();

        env::set_var(
            "TASKS_LOADER_TEST_ENV_BACKENDS__LAMBDA__OPTIONS__AWS_REGION",
            "eu-central-1",
        );

        let config = ConfigLoader::new()
            .with_env_prefix("TASKS_LOADER_TEST_ENV")
            .with_file(file.path())
            .load()
            .expect("config loads");

        env::remove_var("TASKS_LOADER_TEST_ENV_BACKENDS__LAMBDA__OPTIONS__AWS_REGION");

        let lambda = &config.backends["lambda"];
        assert_eq!(
            lambda.options.optional_str("AWS_REGION").as_deref(),
            Some("eu-central-1")
        );
    }

    #[test]
    fn test_missing_file_is_a_load_error() {
        let result = ConfigLoader::new()
            .with_env_prefix("TASKS_LOADER_TEST_MISSING")
            .with_file("/nonexistent/tasks.toml")
            .load();

        assert!(matches!(result, Err(ConfigurationError::Load { .. })));
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = ConfigLoader::new()
            .with_env_prefix("TASKS_LOADER_TEST_EMPTY")
            .load()
            .expect("empty config loads");

        assert_eq!(config.default_backend, "default");
        assert!(config.backends.is_empty());
        assert_eq!(config.dispatch.publish_timeout_seconds, 5);
    }
}
