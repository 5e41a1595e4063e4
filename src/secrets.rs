//! Types for discovering registry access secrets

use std::collections::HashMap;
use std::env;
use std::fmt;

use docker_credential::{CredentialRetrievalError, DockerCredential};
use tracing::debug;

use crate::errors::{RegistryAuthError, Result};
use crate::reference::{
    DEFAULT_REGISTRY_DOMAIN, DEFAULT_REGISTRY_HOST, LEGACY_DEFAULT_REGISTRY_KEY,
};

/// Default variable holding the registry username for [`EnvCredentials`]
pub const DEFAULT_USERNAME_VAR: &str = "REPO_USER";

/// Default variable holding the registry password for [`EnvCredentials`]
pub const DEFAULT_PASSWORD_VAR: &str = "REPO_PASS";

/// Credentials used to access a registry
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// A username and password pair
    Basic {
        /// The registry username
        username: String,
        /// The registry password
        password: String,
    },

    /// A token obtained by a previous login, as stored by docker credential helpers
    IdentityToken(String),
}

impl Credentials {
    /// Creates basic credentials from a username and password
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Basic {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = String::from("<redacted>");
        match self {
            Credentials::Basic { .. } => f
                .debug_struct("Basic")
                .field("username", &redacted)
                .field("password", &redacted)
                .finish(),
            Credentials::IdentityToken(_) => {
                f.debug_tuple("IdentityToken").field(&redacted).finish()
            }
        }
    }
}

impl From<DockerCredential> for Credentials {
    fn from(credential: DockerCredential) -> Self {
        match credential {
            DockerCredential::UsernamePassword(username, password) => {
                Credentials::Basic { username, password }
            }
            DockerCredential::IdentityToken(token) => Credentials::IdentityToken(token),
        }
    }
}

/// A place credentials for a registry can be discovered in.
///
/// `registry` is the canonical registry address, as returned by
/// [`crate::reference::normalize_registry`]. Implementations return
/// `Ok(None)` when they simply hold nothing for the registry, and an error
/// only when the lookup itself failed.
pub trait CredentialSource: Send + Sync {
    /// Looks up the credentials stored for `registry`
    fn credentials(&self, registry: &str) -> Result<Option<Credentials>>;
}

impl<S: CredentialSource + ?Sized> CredentialSource for &S {
    fn credentials(&self, registry: &str) -> Result<Option<Credentials>> {
        (**self).credentials(registry)
    }
}

impl<S: CredentialSource + ?Sized> CredentialSource for Box<S> {
    fn credentials(&self, registry: &str) -> Result<Option<Credentials>> {
        (**self).credentials(registry)
    }
}

/// Tries the first source, then the second one if the first holds nothing.
impl<A: CredentialSource, B: CredentialSource> CredentialSource for (A, B) {
    fn credentials(&self, registry: &str) -> Result<Option<Credentials>> {
        match self.0.credentials(registry)? {
            Some(credentials) => Ok(Some(credentials)),
            None => self.1.credentials(registry),
        }
    }
}

/// A source that never holds any credentials
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCredentials;

impl CredentialSource for NoCredentials {
    fn credentials(&self, _registry: &str) -> Result<Option<Credentials>> {
        Ok(None)
    }
}

/// Credentials configured per registry in memory
#[derive(Debug, Default, Clone)]
pub struct StaticCredentials {
    registries: HashMap<String, Credentials>,
}

impl StaticCredentials {
    /// Creates an empty set of credentials
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds credentials for `registry`, replacing any previous entry
    pub fn with(mut self, registry: impl Into<String>, credentials: Credentials) -> Self {
        self.registries.insert(registry.into(), credentials);
        self
    }
}

impl CredentialSource for StaticCredentials {
    fn credentials(&self, registry: &str) -> Result<Option<Credentials>> {
        let mut found = self
            .registries
            .get(registry)
            .or_else(|| self.registries.get(&format!("https://{}", registry)));
        let is_docker_hub =
            registry == DEFAULT_REGISTRY_HOST || registry == DEFAULT_REGISTRY_DOMAIN;
        if found.is_none() && is_docker_hub {
            found = [
                DEFAULT_REGISTRY_HOST,
                DEFAULT_REGISTRY_DOMAIN,
                LEGACY_DEFAULT_REGISTRY_KEY,
            ]
            .iter()
            .find_map(|key| self.registries.get(*key));
        }
        Ok(found.cloned())
    }
}

/// Credentials read from a pair of environment variables.
///
/// The same credentials are returned for every registry, and only when both
/// variables are set to non-empty values.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    username_var: String,
    password_var: String,
}

impl EnvCredentials {
    /// Reads credentials from the given variables
    pub fn new(username_var: impl Into<String>, password_var: impl Into<String>) -> Self {
        Self {
            username_var: username_var.into(),
            password_var: password_var.into(),
        }
    }
}

impl Default for EnvCredentials {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME_VAR, DEFAULT_PASSWORD_VAR)
    }
}

impl CredentialSource for EnvCredentials {
    fn credentials(&self, registry: &str) -> Result<Option<Credentials>> {
        let username = env::var(&self.username_var).unwrap_or_default();
        let password = env::var(&self.password_var).unwrap_or_default();
        if username.is_empty() || password.is_empty() {
            return Ok(None);
        }
        debug!(%registry, var = %self.username_var, "Loaded registry credentials from environment");
        Ok(Some(Credentials::Basic { username, password }))
    }
}

/// Credentials stored by the docker CLI.
///
/// Reads `config.json` from `$DOCKER_CONFIG`, or `~/.docker` when unset,
/// and runs any credential helper configured for the registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct DockerCredentials;

impl CredentialSource for DockerCredentials {
    fn credentials(&self, registry: &str) -> Result<Option<Credentials>> {
        let server = registry.strip_suffix('/').unwrap_or(registry);
        let found = from_retrieval(server, docker_credential::get_credential(server))?;
        if found.is_some() || server != DEFAULT_REGISTRY_HOST {
            return Ok(found);
        }
        // Docker Hub logins are stored under the legacy v1 endpoint.
        from_retrieval(
            LEGACY_DEFAULT_REGISTRY_KEY,
            docker_credential::get_credential(LEGACY_DEFAULT_REGISTRY_KEY),
        )
    }
}

fn from_retrieval(
    server: &str,
    retrieved: std::result::Result<DockerCredential, CredentialRetrievalError>,
) -> Result<Option<Credentials>> {
    match retrieved {
        Ok(credential) => {
            debug!(%server, "Found docker credentials");
            Ok(Some(credential.into()))
        }
        Err(CredentialRetrievalError::ConfigNotFound)
        | Err(CredentialRetrievalError::NoCredentialConfigured) => {
            debug!(%server, "No docker credentials configured");
            Ok(None)
        }
        Err(e) => Err(RegistryAuthError::lookup(server, e)),
    }
}
