//! Image reference parsing and registry host normalization

use oci_spec::distribution::{ParseError, Reference};

/// The registry domain an image reference gets when it names none
pub const DEFAULT_REGISTRY_DOMAIN: &str = "docker.io";

/// The canonical hostname behind [`DEFAULT_REGISTRY_DOMAIN`]
pub const DEFAULT_REGISTRY_HOST: &str = "index.docker.io";

/// The key older docker clients store Docker Hub credentials under
pub const LEGACY_DEFAULT_REGISTRY_KEY: &str = "https://index.docker.io/v1/";

/// Parses `image` into a fully qualified reference.
///
/// Short names are expanded the way docker does it, so `alpine` becomes
/// `docker.io/library/alpine:latest`.
pub fn parse_normalized(image: &str) -> Result<Reference, ParseError> {
    Reference::try_from(image)
}

/// Returns the canonical registry address of an already parsed reference.
///
/// The `docker.io` alias resolves to `index.docker.io`, any other registry is
/// returned as written, including its port.
pub fn registry_address(reference: &Reference) -> &str {
    match reference.registry() {
        DEFAULT_REGISTRY_DOMAIN => DEFAULT_REGISTRY_HOST,
        registry => registry,
    }
}

/// Parses `image` and returns its canonical registry address.
pub fn normalize_registry(image: &str) -> Result<String, ParseError> {
    let reference = parse_normalized(image)?;
    Ok(registry_address(&reference).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("alpine", "index.docker.io")]
    #[case("library/alpine:3.19", "index.docker.io")]
    #[case("docker.io/library/alpine", "index.docker.io")]
    #[case("index.docker.io/library/alpine", "index.docker.io")]
    #[case("ghcr.io/org/app:v1", "ghcr.io")]
    #[case("localhost:5000/app", "localhost:5000")]
    #[case(
        "myregistry.example.com/team/app@sha256:51d9b231d5129e3ffc267c9d455c49d789bf3167b611a07ab6e4b3304c96b0e7",
        "myregistry.example.com"
    )]
    fn test_normalize_registry(#[case] image: &str, #[case] expected: &str) {
        assert_eq!(
            normalize_registry(image).expect("failed to normalize registry"),
            expected
        );
    }

    #[rstest]
    #[case("")]
    #[case("not a valid ref!!")]
    #[case("myregistry.example.com/App")]
    fn test_normalize_registry_rejects_invalid(#[case] image: &str) {
        normalize_registry(image).expect_err("expected a parse error");
    }

    #[test]
    fn test_uppercase_name_without_domain_is_accepted() {
        let reference = parse_normalized("UPPERCASE/app").expect("failed to parse reference");
        assert_eq!(reference.registry(), DEFAULT_REGISTRY_DOMAIN);
        assert_eq!(reference.repository(), "UPPERCASE/app");
        assert_eq!(
            normalize_registry("UPPERCASE/app").expect("failed to normalize registry"),
            DEFAULT_REGISTRY_HOST
        );
    }

    #[test]
    fn test_parse_normalized_expands_short_names() {
        let reference = parse_normalized("alpine").expect("failed to parse reference");
        assert_eq!(reference.registry(), DEFAULT_REGISTRY_DOMAIN);
        assert_eq!(reference.repository(), "library/alpine");
        assert_eq!(registry_address(&reference), DEFAULT_REGISTRY_HOST);
    }
}
