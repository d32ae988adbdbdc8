//! # Structured Logging Module
//!
//! Environment-aware structured logging for dispatch operations. Output goes
//! to the console, as human-readable lines by default or JSON when
//! `TASKS_LOG_FORMAT=json`.

use std::sync::OnceLock;

use chrono::Utc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::BackendKind;
use crate::models::TaskResultStatus;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// `RUST_LOG` wins over the environment default. Safe to call more than once;
/// an already-installed global subscriber is left in place.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json = use_json_format();

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("TASKS_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

fn use_json_format() -> bool {
    std::env::var("TASKS_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for one dispatch attempt
pub fn log_dispatch_operation(
    alias: &str,
    kind: BackendKind,
    destination: &str,
    task_name: &str,
    status: TaskResultStatus,
    message_id: Option<&str>,
    duration_ms: u64,
) {
    tracing::info!(
        alias = %alias,
        backend = %kind,
        destination = %destination,
        task_name = %task_name,
        status = %status,
        message_id = message_id,
        duration_ms = duration_ms,
        timestamp = %Utc::now().to_rfc3339(),
        "📤 DISPATCH_OPERATION"
    );
}

/// Log backend construction or shutdown
pub fn log_backend_operation(operation: &str, alias: &str, kind: BackendKind, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        alias = %alias,
        backend = %kind,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🔌 BACKEND_OPERATION"
    );
}
