//! Pull options carrying registry authentication
//!
//! The image pull itself is performed by the container runtime. This module
//! only works out which credentials to hand it and encodes them the way the
//! runtime expects to receive them in the `X-Registry-Auth` header.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE, Engine as _};
use http::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::errors::Result;
use crate::reference::normalize_registry;
use crate::secrets::{CredentialSource, Credentials, DockerCredentials, EnvCredentials};

/// Header the container runtime reads the encoded auth from
pub const REGISTRY_AUTH_HEADER: &str = "x-registry-auth";

/// Callback invoked by the pull when the registry rejects the supplied auth.
///
/// It returns a replacement encoded auth value, or an empty string to give up.
pub type PrivilegeFunc = fn() -> Result<String>;

/// The credential sources used by [`AuthResolver::default`]
pub type DefaultCredentialSource = (EnvCredentials, DockerCredentials);

/// The JSON payload encoded into the registry auth header
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    /// The registry username
    #[serde(default)]
    pub username: String,
    /// The registry password
    #[serde(default)]
    pub password: String,
    /// The registry the credentials belong to
    #[serde(
        rename = "serveraddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub server_address: Option<String>,
    /// A token used in place of the username and password
    #[serde(
        rename = "identitytoken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub identity_token: Option<String>,
}

impl AuthConfig {
    /// Builds the payload for `credentials`, optionally scoped to `server_address`
    pub fn new(credentials: Credentials, server_address: Option<String>) -> Self {
        match credentials {
            Credentials::Basic { username, password } => AuthConfig {
                username,
                password,
                server_address,
                identity_token: None,
            },
            Credentials::IdentityToken(token) => AuthConfig {
                server_address,
                identity_token: Some(token),
                ..Default::default()
            },
        }
    }

    /// Serializes the payload to JSON and encodes it with URL safe base64
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        Ok(URL_SAFE.encode(json))
    }

    /// Reverses [`AuthConfig::encode`]
    pub fn decode(encoded: &str) -> Result<Self> {
        let json = URL_SAFE.decode(encoded)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = String::from("<redacted>");
        f.debug_struct("AuthConfig")
            .field("username", &redacted)
            .field("password", &redacted)
            .field("server_address", &self.server_address)
            .field(
                "identity_token",
                &self.identity_token.as_ref().map(|_| &redacted),
            )
            .finish()
    }
}

/// Metadata of a container whose image is about to be pulled
pub trait Container {
    /// The image reference the container was created from
    fn image_name(&self) -> &str;

    /// The username configured for the container's registry, if any
    fn registry_username(&self) -> Option<&str> {
        None
    }

    /// The password configured for the container's registry, if any
    fn registry_password(&self) -> Option<&str> {
        None
    }
}

/// A plain [`Container`] for callers without their own container type
#[derive(Debug, Clone, Default)]
pub struct ContainerInfo {
    /// The image reference
    pub image_name: String,
    /// Explicit registry username
    pub registry_username: Option<String>,
    /// Explicit registry password
    pub registry_password: Option<String>,
}

impl ContainerInfo {
    /// Describes a container without explicit registry credentials
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            ..Default::default()
        }
    }

    /// Sets explicit registry credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.registry_username = Some(username.into());
        self.registry_password = Some(password.into());
        self
    }
}

impl Container for ContainerInfo {
    fn image_name(&self) -> &str {
        &self.image_name
    }

    fn registry_username(&self) -> Option<&str> {
        self.registry_username.as_deref()
    }

    fn registry_password(&self) -> Option<&str> {
        self.registry_password.as_deref()
    }
}

/// Options handed to the container runtime for a single image pull
#[derive(Clone, Default)]
pub struct PullOptions {
    /// The encoded registry auth. `None` pulls anonymously.
    pub registry_auth: Option<String>,
    /// Called when the registry rejects `registry_auth`
    pub privilege_func: Option<PrivilegeFunc>,
}

impl PullOptions {
    /// Returns `true` if the pull carries no credentials
    pub fn is_anonymous(&self) -> bool {
        self.registry_auth.is_none()
    }

    /// Renders the encoded auth as an `X-Registry-Auth` header
    pub fn registry_auth_header(&self) -> Result<Option<(HeaderName, HeaderValue)>> {
        let auth = match &self.registry_auth {
            Some(auth) => auth,
            None => return Ok(None),
        };
        let mut value = HeaderValue::from_str(auth)?;
        value.set_sensitive(true);
        Ok(Some((HeaderName::from_static(REGISTRY_AUTH_HEADER), value)))
    }
}

impl fmt::Debug for PullOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PullOptions")
            .field(
                "registry_auth",
                &self.registry_auth.as_ref().map(|_| "<redacted>"),
            )
            .field("privilege_func", &self.privilege_func.is_some())
            .finish()
    }
}

/// Invoked by the pull if the registry rejects the supplied auth.
///
/// It could return a new value for the auth header, but retrying with the
/// credentials that were just rejected is pointless and there is no other
/// source at this point, so it always gives up.
pub fn default_auth_handler() -> Result<String> {
    warn!("Authentication request was rejected, not trying again");
    Ok(String::new())
}

/// Resolves the credentials to pull an image with.
///
/// Explicit credentials take precedence over the ones the
/// [`CredentialSource`] holds for the image's registry. When neither has
/// any, the image is pulled anonymously.
#[derive(Debug, Clone)]
pub struct AuthResolver<S = DefaultCredentialSource> {
    source: S,
}

impl Default for AuthResolver {
    fn default() -> Self {
        Self::new((EnvCredentials::default(), DockerCredentials))
    }
}

impl<S: CredentialSource> AuthResolver<S> {
    /// Creates a resolver discovering credentials in `source`
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Builds the pull options for `container`
    pub fn pull_options(&self, container: &impl Container) -> Result<PullOptions> {
        let auth = self.encoded_auth(
            container.image_name(),
            container.registry_username(),
            container.registry_password(),
        )?;

        if auth.is_empty() {
            return Ok(PullOptions::default());
        }

        Ok(PullOptions {
            registry_auth: Some(auth),
            privilege_func: Some(default_auth_handler),
        })
    }

    /// Returns the encoded auth to pull `image` with, or an empty string if
    /// no credentials are available.
    ///
    /// `username` and `password` are only used when both are non-empty.
    pub fn encoded_auth(
        &self,
        image: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<String> {
        debug!(%image, "Resolving registry auth");
        let auth = match self.auth_config(image, username, password)? {
            Some(config) => config.encode()?,
            None => String::new(),
        };
        if !auth.is_empty() {
            trace!(%auth, "Encoded registry auth");
        }
        Ok(auth)
    }

    fn auth_config(
        &self,
        image: &str,
        username: Option<&str>,
        password: Option<&str>,
    ) -> Result<Option<AuthConfig>> {
        let username = username.filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());
        if let (Some(username), Some(password)) = (username, password) {
            debug!(%image, "Using explicit registry credentials");
            return Ok(Some(AuthConfig::new(
                Credentials::basic(username, password),
                None,
            )));
        }

        let registry = match normalize_registry(image) {
            Ok(registry) => registry,
            Err(error) => {
                debug!(%image, ?error, "Cannot determine registry, skipping credential lookup");
                return Ok(None);
            }
        };

        match self.source.credentials(&registry)? {
            Some(credentials) => {
                debug!(%registry, "Using discovered registry credentials");
                Ok(Some(AuthConfig::new(credentials, Some(registry))))
            }
            None => {
                debug!(%registry, "No credentials found, pulling anonymously");
                Ok(None)
            }
        }
    }
}
