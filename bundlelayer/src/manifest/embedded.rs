//! Manifest of the bundles shipped with the application.

use tracing::{info, warn};

use super::error::ManifestResult;
use super::types::Manifest;
use super::validity::LocalValidityChecker;
use crate::fetch::BundleFetcher;

/// File name of a manifest under any root.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// The locally-shipped manifest.
///
/// Describes which bundles are baked into the application and answers
/// validity queries without any network access. Loaded once per session.
/// When loading fails the empty manifest is used, so nothing counts as valid
/// and every bundle is re-acquired.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedManifest {
    manifest: Manifest,
}

impl EmbeddedManifest {
    /// Wrap an already-parsed manifest.
    pub fn new(manifest: Manifest) -> Self {
        Self { manifest }
    }

    /// The manifest that validates nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load [`MANIFEST_FILE_NAME`] through a fetcher rooted at the local
    /// bundle directory.
    ///
    /// # Errors
    ///
    /// Returns a fetch error when the file cannot be read and a parse error
    /// when it is not a valid manifest.
    pub async fn load(fetcher: &BundleFetcher) -> ManifestResult<Self> {
        let bytes = fetcher.try_fetch_stream(MANIFEST_FILE_NAME).await?;
        Ok(Self::new(Manifest::from_slice(&bytes)?))
    }

    /// Load the embedded manifest, falling back to [`EmbeddedManifest::empty`]
    /// on any failure.
    pub async fn load_or_empty(fetcher: &BundleFetcher) -> Self {
        match Self::load(fetcher).await {
            Ok(embedded) => {
                info!(
                    root = %fetcher.root(),
                    build = embedded.manifest.build(),
                    bundles = embedded.manifest.len(),
                    "Embedded manifest loaded"
                );
                embedded
            }
            Err(e) => {
                warn!(
                    root = %fetcher.root(),
                    error = %e,
                    "Embedded manifest unavailable; no shipped bundle will be trusted"
                );
                Self::empty()
            }
        }
    }

    /// The wrapped manifest.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Check for an exact local entry.
    pub fn contains(&self, name: &str, checksum: &str, size: u64) -> bool {
        self.manifest
            .get(name)
            .is_some_and(|bundle| bundle.size == size && bundle.checksum == checksum)
    }
}

impl LocalValidityChecker for EmbeddedManifest {
    fn is_valid(&self, name: &str, checksum: &str, size: u64) -> bool {
        self.contains(name, checksum, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::{HttpResponse, MockHttpClient};
    use crate::manifest::BundleInfo;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn embedded_with(name: &str, checksum: &str, size: u64) -> EmbeddedManifest {
        EmbeddedManifest::new(
            Manifest::new(1, "local", vec![BundleInfo::new(name, checksum, size)]).unwrap(),
        )
    }

    #[test]
    fn test_exact_match_is_valid() {
        let embedded = embedded_with("gfx01", "abc", 1000);
        assert!(embedded.is_valid("gfx01", "abc", 1000));
    }

    #[test]
    fn test_size_mismatch_is_invalid() {
        let embedded = embedded_with("gfx01", "abc", 999);
        assert!(!embedded.is_valid("gfx01", "abc", 1000));
    }

    #[test]
    fn test_checksum_mismatch_is_invalid() {
        let embedded = embedded_with("gfx01", "abd", 1000);
        assert!(!embedded.is_valid("gfx01", "abc", 1000));
    }

    #[test]
    fn test_unknown_name_is_invalid() {
        let embedded = embedded_with("gfx01", "abc", 1000);
        assert!(!embedded.is_valid("gfx02", "abc", 1000));
    }

    #[test]
    fn test_empty_validates_nothing() {
        let embedded = EmbeddedManifest::empty();
        assert!(!embedded.is_valid("gfx01", "abc", 1000));
        assert!(embedded.manifest().is_empty());
    }

    proptest! {
        #[test]
        fn prop_valid_only_on_exact_match(
            checksum in "[a-f0-9]{1,8}",
            size in 0u64..10_000,
            other_checksum in "[a-f0-9]{1,8}",
            other_size in 0u64..10_000,
        ) {
            let embedded = embedded_with("bundle", &checksum, size);
            let expected = checksum == other_checksum && size == other_size;
            prop_assert_eq!(embedded.is_valid("bundle", &other_checksum, other_size), expected);
            prop_assert!(embedded.is_valid("bundle", &checksum, size));
        }
    }

    #[tokio::test]
    async fn test_load_from_fetcher() {
        let json = r#"{"build": 4, "tag": "ship", "bundles": [{"name": "gfx01", "checksum": "abc", "size": 1000}]}"#;
        let client = Arc::new(MockHttpClient::new().with_response(
            "file:///app/bundles/manifest.json",
            HttpResponse::ok(json.as_bytes().to_vec()),
        ));
        let fetcher = BundleFetcher::new(client, "/app/bundles");

        let embedded = EmbeddedManifest::load(&fetcher).await.unwrap();

        assert_eq!(embedded.manifest().build(), 4);
        assert!(embedded.is_valid("gfx01", "abc", 1000));
    }

    #[tokio::test]
    async fn test_load_or_empty_on_missing_file() {
        let client = Arc::new(MockHttpClient::new());
        let fetcher = BundleFetcher::new(client, "/app/bundles");

        assert!(EmbeddedManifest::load(&fetcher).await.is_err());
        let embedded = EmbeddedManifest::load_or_empty(&fetcher).await;
        assert!(embedded.manifest().is_empty());
    }

    #[tokio::test]
    async fn test_load_or_empty_on_malformed_file() {
        let client = Arc::new(MockHttpClient::new().with_response(
            "file:///app/bundles/manifest.json",
            HttpResponse::ok(b"{ nope".to_vec()),
        ));
        let fetcher = BundleFetcher::new(client, "/app/bundles");

        let embedded = EmbeddedManifest::load_or_empty(&fetcher).await;
        assert!(!embedded.is_valid("gfx01", "abc", 1000));
    }
}
