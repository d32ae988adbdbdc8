//! # Constants
//!
//! Option keys recognized in backend configuration and dispatch defaults.
//! Key names follow the host framework's settings layout so existing
//! deployments can keep their environment variables.

/// Alias used when the caller does not name a backend
pub const DEFAULT_BACKEND_ALIAS: &str = "default";

/// Per-call network timeout handed to transports that accept one
pub const DEFAULT_PUBLISH_TIMEOUT_SECONDS: u64 = 5;

/// Prefix of generated one-shot schedule names
pub const DEFAULT_SCHEDULE_NAME_PREFIX: &str = "task";

/// EventBridge Scheduler rejects names longer than this
pub const MAX_SCHEDULE_NAME_LENGTH: usize = 64;

/// Option keys for the AWS backend family
pub mod aws {
    pub const REGION: &str = "AWS_REGION";
    pub const DEFAULT_QUEUE_NAME: &str = "AWS_DEFAULT_QUEUE_NAME";
    pub const DEFAULT_TOPIC_NAME: &str = "AWS_DEFAULT_TOPIC_NAME";
    pub const SNS_ARN_PREFIX: &str = "AWS_SNS_ARN_PREFIX";
    pub const DEFAULT_SQS_QUEUE_NAME: &str = "AWS_DEFAULT_SQS_QUEUE_NAME";
    pub const SCHEDULER_ROLE_ARN: &str = "EVENTBRIDGE_SCHEDULER_ROLE_ARN";
    pub const DEFAULT_LAMBDA_FUNCTION_NAME: &str = "AWS_DEFAULT_LAMBDA_FUNCTION_NAME";
}

/// Option keys for Azure Service Bus backends
pub mod service_bus {
    pub const DEFAULT_QUEUE_NAME: &str = "SERVICEBUS_DEFAULT_QUEUE_NAME";
    pub const DEFAULT_TOPIC_NAME: &str = "SERVICEBUS_DEFAULT_TOPIC_NAME";
    pub const USE_CONNECTION_STRING: &str = "SERVICEBUS_USE_CONNECTION_STRING";
    pub const CONNECTION_STRING: &str = "SERVICEBUS_CONNECTION_STRING";
    pub const NAMESPACE_FQDN: &str = "SERVICEBUS_NAMESPACE_FQDN";
    pub const CREDENTIAL_LOADER: &str = "SERVICEBUS_CREDENTIAL_LOADER";
}

/// Option keys for the Azure Storage Account queue backend
pub mod storage_queue {
    pub const DEFAULT_QUEUE_NAME: &str = "STORAGE_ACCOUNT_QUEUE_DEFAULT_QUEUE_NAME";
    pub const USE_CONNECTION_STRING: &str = "STORAGE_ACCOUNT_USE_CONNECTION_STRING";
    pub const CONNECTION_STRING: &str = "STORAGE_ACCOUNT_CONNECTION_STRING";
    pub const ACCOUNT_URL: &str = "STORAGE_ACCOUNT_URL";
    pub const CREDENTIAL_LOADER: &str = "STORAGE_ACCOUNT_CREDENTIAL_LOADER";
}

/// Substrings that mark an option value as sensitive when rendered for logs
pub const SENSITIVE_OPTION_PATTERNS: &[&str] =
    &["CONNECTION_STRING", "SECRET", "PASSWORD", "TOKEN", "KEY"];
