//! Registry credential resolution and digest-check classification for
//! container image pulls
#![deny(missing_docs)]

pub mod digest;
pub mod errors;
pub mod pull;
pub mod reference;
pub mod secrets;

#[doc(inline)]
pub use digest::is_cheap_digest_check_supported;
#[doc(inline)]
pub use errors::{RegistryAuthError, Result};
#[doc(inline)]
pub use pull::{default_auth_handler, AuthResolver, Container, ContainerInfo, PullOptions};
#[doc(inline)]
pub use secrets::{CredentialSource, Credentials};

#[macro_use]
extern crate lazy_static;
