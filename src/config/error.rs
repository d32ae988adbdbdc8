//! Configuration errors raised while loading settings or constructing backends.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Unset: {key} (backend '{backend}')")]
    MissingOption { backend: String, key: String },

    #[error("Invalid option {key} for backend '{backend}': {reason}")]
    InvalidOption {
        backend: String,
        key: String,
        reason: String,
    },

    #[error("Unknown credential loader '{reference}'")]
    UnknownCredentialLoader { reference: String },

    #[error("Failed to construct transport client for backend '{backend}': {message}")]
    ClientConstruction { backend: String, message: String },

    #[error("Unknown backend kind '{value}'")]
    UnknownBackendKind { value: String },

    #[error("Failed to load configuration: {message}")]
    Load { message: String },
}

impl ConfigurationError {
    pub fn missing_option(backend: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingOption {
            backend: backend.into(),
            key: key.into(),
        }
    }

    pub fn invalid_option(
        backend: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOption {
            backend: backend.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn unknown_credential_loader(reference: impl Into<String>) -> Self {
        Self::UnknownCredentialLoader {
            reference: reference.into(),
        }
    }

    pub fn client_construction(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ClientConstruction {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::Load {
            message: message.into(),
        }
    }
}

impl From<::config::ConfigError> for ConfigurationError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::load(err.to_string())
    }
}

pub type ConfigResult<T> = Result<T, ConfigurationError>;
