//! Classification of registries by how they handle digest checks
//!
//! A digest check compares the digest of a local image against the one the
//! registry reports for the same reference, using a `HEAD` request on the
//! manifest instead of a full pull. Not every registry answers those requests
//! reliably, so callers use [`is_cheap_digest_check_supported`] to decide
//! whether to warn before relying on one.

use std::collections::HashSet;

use crate::reference::{normalize_registry, parse_normalized, DEFAULT_REGISTRY_HOST};

/// The registry hosted by GitHub
pub const GITHUB_REGISTRY_HOST: &str = "ghcr.io";

lazy_static! {
    static ref CHEAP_DIGEST_CHECK_HOSTS: HashSet<&'static str> =
        [DEFAULT_REGISTRY_HOST, GITHUB_REGISTRY_HOST].into_iter().collect();
}

/// Returns `true` if the registry of `image` is known to answer `HEAD`
/// manifest requests correctly, or if the registry cannot be determined.
///
/// Returns `false` when the registry's behavior is unknown, in which case the
/// caller should warn before consuming its API with digest checks.
pub fn is_cheap_digest_check_supported(image: &str) -> bool {
    let normalized = match parse_normalized(image) {
        Ok(reference) => reference,
        Err(error) => {
            tracing::trace!(%image, ?error, "Cannot parse image reference, skipping digest check warning");
            return true;
        }
    };

    let host = match normalize_registry(&normalized.to_string()) {
        Ok(host) => host,
        Err(error) => {
            tracing::trace!(%image, ?error, "Cannot normalize registry, skipping digest check warning");
            return true;
        }
    };

    CHEAP_DIGEST_CHECK_HOSTS.contains(host.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("docker.io/library/alpine", true)]
    #[case("alpine", true)]
    #[case("library/alpine:3.19", true)]
    #[case("index.docker.io/library/alpine:latest", true)]
    #[case("ghcr.io/org/app", true)]
    #[case("ghcr.io/org/app:v1.2.3", true)]
    #[case("myregistry.example.com/app", false)]
    #[case("localhost:5000/app", false)]
    #[case("quay.io/coreos/etcd", false)]
    #[case("registry-1.docker.io/library/alpine", false)]
    fn test_is_cheap_digest_check_supported(#[case] image: &str, #[case] expected: bool) {
        assert_eq!(is_cheap_digest_check_supported(image), expected);
    }

    #[rstest]
    #[case("not a valid ref!!")]
    #[case("")]
    #[case("myregistry.example.com/App")]
    #[case("example.com/app:bad tag")]
    fn test_unparseable_references_fail_open(#[case] image: &str) {
        assert!(is_cheap_digest_check_supported(image));
    }

    #[test]
    fn test_classification_is_repeatable() {
        for image in ["ghcr.io/org/app", "myregistry.example.com/app", "%%%"] {
            let first = is_cheap_digest_check_supported(image);
            for _ in 0..10 {
                assert_eq!(is_cheap_digest_check_supported(image), first);
            }
        }
    }
}
