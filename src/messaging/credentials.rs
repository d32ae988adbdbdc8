//! # Credential Registry
//!
//! Identity-based authentication takes a credential object. Which credential to
//! use is configured by name (`*_CREDENTIAL_LOADER`); the name is looked up in a
//! registry of zero-argument factories populated by the application at startup.
//! When no loader is configured the registry's default loader is used, which
//! yields [`DefaultCredential`] unless the application replaces it.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use crate::config::{ConfigResult, ConfigurationError};

/// Opaque credential handed to a client factory
pub trait Credential: Send + Sync + fmt::Debug {
    /// Short description for logs, never the secret itself
    fn credential_type(&self) -> &str;
}

/// Marker for the transport's ambient credential chain
/// (environment, managed identity, developer login)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultCredential;

impl Credential for DefaultCredential {
    fn credential_type(&self) -> &str {
        "default"
    }
}

/// Zero-argument credential factory
pub type CredentialLoader = Arc<dyn Fn() -> Arc<dyn Credential> + Send + Sync>;

/// String key → credential factory lookup table
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use tasks_cloud::messaging::credentials::{CredentialRegistry, DefaultCredential};
///
/// let registry = CredentialRegistry::new();
/// registry.register("myapp.credentials.ci", || Arc::new(DefaultCredential));
///
/// assert!(registry.load_named("myapp.credentials.ci").is_ok());
/// assert!(registry.load_named("missing").is_err());
/// ```
#[derive(Clone)]
pub struct CredentialRegistry {
    loaders: Arc<DashMap<String, CredentialLoader>>,
    default_loader: CredentialLoader,
}

impl fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.loaders.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("CredentialRegistry")
            .field("loaders", &names)
            .finish()
    }
}

impl Default for CredentialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialRegistry {
    pub fn new() -> Self {
        Self {
            loaders: Arc::new(DashMap::new()),
            default_loader: Arc::new(|| Arc::new(DefaultCredential)),
        }
    }

    /// Replace the loader used when no named loader is configured
    pub fn with_default_loader<F>(mut self, loader: F) -> Self
    where
        F: Fn() -> Arc<dyn Credential> + Send + Sync + 'static,
    {
        self.default_loader = Arc::new(loader);
        self
    }

    pub fn register<F>(&self, reference: impl Into<String>, loader: F)
    where
        F: Fn() -> Arc<dyn Credential> + Send + Sync + 'static,
    {
        let reference = reference.into();
        debug!("Registered credential loader '{}'", reference);
        self.loaders.insert(reference, Arc::new(loader));
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.loaders.contains_key(reference)
    }

    pub fn load_default(&self) -> Arc<dyn Credential> {
        (self.default_loader)()
    }

    pub fn load_named(&self, reference: &str) -> ConfigResult<Arc<dyn Credential>> {
        let loader = self
            .loaders
            .get(reference)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ConfigurationError::unknown_credential_loader(reference))?;
        Ok(loader())
    }

    /// Named loader when `reference` is set, otherwise the default loader
    pub fn resolve(&self, reference: Option<&str>) -> ConfigResult<Arc<dyn Credential>> {
        match reference {
            Some(reference) => self.load_named(reference),
            None => Ok(self.load_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StaticToken;

    impl Credential for StaticToken {
        fn credential_type(&self) -> &str {
            "static-token"
        }
    }

    #[test]
    fn test_default_loader_yields_default_credential() {
        let registry = CredentialRegistry::new();
        assert_eq!(registry.load_default().credential_type(), "default");
        assert_eq!(registry.resolve(None).unwrap().credential_type(), "default");
    }

    #[test]
    fn test_named_loader_lookup() {
        let registry = CredentialRegistry::new();
        registry.register("app.creds.static", || Arc::new(StaticToken));

        assert!(registry.contains("app.creds.static"));
        let credential = registry.resolve(Some("app.creds.static")).unwrap();
        assert_eq!(credential.credential_type(), "static-token");
    }

    #[test]
    fn test_unknown_loader_is_configuration_error() {
        let registry = CredentialRegistry::new();
        let err = registry.load_named("app.creds.missing").unwrap_err();
        assert_eq!(err, ConfigurationError::unknown_credential_loader("app.creds.missing"));
    }

    #[test]
    fn test_clones_share_registrations() {
        let registry = CredentialRegistry::new();
        let clone = registry.clone();
        clone.register("late", || Arc::new(StaticToken));
        assert!(registry.contains("late"));
    }

    #[test]
    fn test_custom_default_loader() {
        let registry = CredentialRegistry::new().with_default_loader(|| Arc::new(StaticToken));
        assert_eq!(registry.load_default().credential_type(), "static-token");
    }
}
