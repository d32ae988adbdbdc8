//! Azure client construction: connection-string or identity-based auth.

use std::sync::Arc;

use tracing::debug;

use crate::config::{BackendKind, BackendOptions, ConfigResult, ConfigurationError};
use crate::constants::{service_bus, storage_queue};
use crate::messaging::{ClientFactory, CredentialRegistry};

/// Option keys selecting and parameterizing the auth path
#[derive(Debug, Clone, Copy)]
pub struct AuthOptionKeys {
    pub use_connection_string: &'static str,
    pub connection_string: &'static str,
    /// Namespace FQDN or account URL
    pub address: &'static str,
    pub credential_loader: &'static str,
}

pub const SERVICE_BUS_AUTH: AuthOptionKeys = AuthOptionKeys {
    use_connection_string: service_bus::USE_CONNECTION_STRING,
    connection_string: service_bus::CONNECTION_STRING,
    address: service_bus::NAMESPACE_FQDN,
    credential_loader: service_bus::CREDENTIAL_LOADER,
};

pub const STORAGE_QUEUE_AUTH: AuthOptionKeys = AuthOptionKeys {
    use_connection_string: storage_queue::USE_CONNECTION_STRING,
    connection_string: storage_queue::CONNECTION_STRING,
    address: storage_queue::ACCOUNT_URL,
    credential_loader: storage_queue::CREDENTIAL_LOADER,
};

/// Build a client from options
///
/// With `use_connection_string` (default `true`) the connection string is
/// required. Otherwise the address is required and the credential comes from the
/// configured loader, or the registry's default loader when none is set.
pub fn build_client<C: ?Sized>(
    kind: BackendKind,
    options: &BackendOptions,
    keys: &AuthOptionKeys,
    factory: &dyn ClientFactory<C>,
    credentials: &CredentialRegistry,
) -> ConfigResult<Arc<C>> {
    let backend = kind.as_str();

    let client = if options.bool_or(backend, keys.use_connection_string, true)? {
        let connection_string = options.required_str(backend, keys.connection_string)?;
        debug!(backend, "Constructing client from connection string");
        factory.from_connection_string(&connection_string)
    } else {
        let address = options.required_str(backend, keys.address)?;
        let loader = options.optional_str(keys.credential_loader);
        let credential = credentials.resolve(loader.as_deref())?;
        debug!(
            backend,
            address = %address,
            credential_type = credential.credential_type(),
            "Constructing client from identity"
        );
        factory.from_identity(&address, credential)
    };

    client.map_err(|err| ConfigurationError::client_construction(backend, err.to_string()))
}
