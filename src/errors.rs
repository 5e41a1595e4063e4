//! Errors related to resolving and encoding registry credentials

/// Crate-wide result type
pub type Result<T> = std::result::Result<T, RegistryAuthError>;

/// The error type for registry credential resolution
#[derive(Debug, thiserror::Error)]
pub enum RegistryAuthError {
    /// The image reference could not be parsed into a normalized form
    #[error("Failed to parse image reference: {0}")]
    ReferenceParse(#[from] oci_spec::distribution::ParseError),
    /// A credential source failed while looking up credentials for a registry
    #[error("Failed to look up credentials for registry {registry}: {reason}")]
    CredentialLookup {
        /// The registry whose credentials were requested
        registry: String,
        /// Why the lookup failed
        reason: String,
    },
    /// The auth payload could not be converted to or from JSON
    #[error("Invalid registry auth payload: {0}")]
    Encoding(#[from] serde_json::Error),
    /// An encoded auth value is not valid base64
    #[error("Failed to decode registry auth: {0}")]
    Decoding(#[from] base64::DecodeError),
    /// The encoded auth is not a valid header value
    #[error("Invalid registry auth header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl RegistryAuthError {
    pub(crate) fn lookup(registry: &str, reason: impl ToString) -> Self {
        RegistryAuthError::CredentialLookup {
            registry: registry.to_string(),
            reason: reason.to_string(),
        }
    }
}
