//! Dual-mode bundle fetcher.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use super::checksum::verify_payload;
use super::error::{FetchError, FetchResult};
use super::http::AsyncHttpClient;
use crate::bundle::Bundle;
use crate::config::to_root_uri;

/// Fetches named bundles from one root, as raw bytes or as parsed bundles.
///
/// Holds no mutable state, so concurrent fetches for different names run in
/// parallel without coordination. Cloning is cheap.
#[derive(Clone)]
pub struct BundleFetcher {
    client: Arc<dyn AsyncHttpClient>,
    root: String,
    verify_checksums: bool,
}

impl BundleFetcher {
    /// Create a fetcher for `root`.
    ///
    /// A root without a scheme is treated as a filesystem path. Payload
    /// verification is on by default.
    pub fn new(client: Arc<dyn AsyncHttpClient>, root: &str) -> Self {
        Self {
            client,
            root: to_root_uri(root),
            verify_checksums: true,
        }
    }

    /// Enable or disable size/checksum verification in [`fetch_bundle`](Self::fetch_bundle).
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }

    /// The root URI.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Location of a named entry: `<root>/<name>`.
    pub fn uri_for(&self, name: &str) -> String {
        let name = name.trim_start_matches('/');
        if self.root.ends_with('/') {
            format!("{}{}", self.root, name)
        } else {
            format!("{}/{}", self.root, name)
        }
    }

    /// Fetch the raw bytes of `name`.
    ///
    /// # Errors
    ///
    /// Returns the transport error, or [`FetchError::Status`] for any status
    /// other than `200`.
    pub async fn try_fetch_stream(&self, name: &str) -> FetchResult<Bytes> {
        let uri = self.uri_for(name);
        let response = self.client.get(&uri).await?;
        if !response.is_success() {
            return Err(FetchError::Status {
                uri,
                status: response.status,
            });
        }

        debug!(uri = %uri, bytes = response.body.len(), "Fetched");
        Ok(response.body)
    }

    /// Fetch the raw bytes of `name`, logging and swallowing failures.
    pub async fn fetch_stream(&self, name: &str) -> Option<Bytes> {
        match self.try_fetch_stream(name).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(bundle = %name, error = %e, "Stream fetch failed");
                None
            }
        }
    }

    /// Fetch `name` and parse it as a bundle.
    ///
    /// With verification enabled the payload must match `size` and
    /// `checksum` before it is parsed.
    ///
    /// # Errors
    ///
    /// Returns the transport/status error, a size or checksum mismatch, or
    /// [`FetchError::InvalidBundle`] when the payload does not parse.
    pub async fn try_fetch_bundle(&self, name: &str, checksum: &str, size: u64) -> FetchResult<Bundle> {
        let body = self.try_fetch_stream(name).await?;
        if self.verify_checksums {
            verify_payload(name, &body, checksum, size)?;
        }

        Bundle::parse(name, body).map_err(|source| FetchError::InvalidBundle {
            name: name.to_string(),
            source,
        })
    }

    /// Fetch and parse `name`, logging and swallowing failures.
    pub async fn fetch_bundle(&self, name: &str, checksum: &str, size: u64) -> Option<Bundle> {
        match self.try_fetch_bundle(name, checksum, size).await {
            Ok(bundle) => Some(bundle),
            Err(e) => {
                warn!(bundle = %name, error = %e, "Bundle fetch failed");
                None
            }
        }
    }
}

impl fmt::Debug for BundleFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleFetcher")
            .field("root", &self.root)
            .field("verify_checksums", &self.verify_checksums)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleBuilder;
    use crate::fetch::{sha256_hex, HttpResponse, MockHttpClient};

    const ROOT: &str = "https://cdn.example.com/bundles";

    fn bundle_bytes() -> Vec<u8> {
        BundleBuilder::new()
            .with_entry("gfx/hero.png", vec![7; 32])
            .build()
            .unwrap()
    }

    fn fetcher_with(client: MockHttpClient) -> BundleFetcher {
        BundleFetcher::new(Arc::new(client), ROOT)
    }

    #[test]
    fn test_uri_for() {
        let fetcher = fetcher_with(MockHttpClient::new());
        assert_eq!(fetcher.uri_for("gfx01"), "https://cdn.example.com/bundles/gfx01");
        assert_eq!(fetcher.uri_for("/gfx01"), "https://cdn.example.com/bundles/gfx01");

        let slash = BundleFetcher::new(Arc::new(MockHttpClient::new()), "https://cdn/");
        assert_eq!(slash.uri_for("gfx01"), "https://cdn/gfx01");
    }

    #[test]
    fn test_plain_path_root_becomes_file_uri() {
        let fetcher = BundleFetcher::new(Arc::new(MockHttpClient::new()), "/app/bundles");
        assert_eq!(fetcher.root(), "file:///app/bundles");
        assert_eq!(fetcher.uri_for("gfx01"), "file:///app/bundles/gfx01");
    }

    #[tokio::test]
    async fn test_fetch_stream_success() {
        let client = MockHttpClient::new()
            .with_response(&format!("{}/raw.bin", ROOT), HttpResponse::ok(vec![1, 2, 3]));
        let fetcher = fetcher_with(client);

        let bytes = fetcher.fetch_stream("raw.bin").await.unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_stream_non_success_status() {
        let client = MockHttpClient::new()
            .with_response(&format!("{}/raw.bin", ROOT), HttpResponse::new(500, Bytes::new()));
        let fetcher = fetcher_with(client);

        assert!(fetcher.fetch_stream("raw.bin").await.is_none());
        assert!(matches!(
            fetcher.try_fetch_stream("raw.bin").await,
            Err(FetchError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_stream_transport_error() {
        let client =
            MockHttpClient::new().with_transport_error(&format!("{}/raw.bin", ROOT), "reset");
        let fetcher = fetcher_with(client);

        assert!(fetcher.fetch_stream("raw.bin").await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_bundle_verified() {
        let raw = bundle_bytes();
        let checksum = sha256_hex(&raw);
        let size = raw.len() as u64;
        let client =
            MockHttpClient::new().with_response(&format!("{}/gfx01", ROOT), HttpResponse::ok(raw));
        let fetcher = fetcher_with(client);

        let bundle = fetcher.fetch_bundle("gfx01", &checksum, size).await.unwrap();
        assert_eq!(bundle.name(), "gfx01");
        assert!(bundle.contains("gfx/hero.png"));
    }

    #[tokio::test]
    async fn test_fetch_bundle_rejects_checksum_mismatch() {
        let raw = bundle_bytes();
        let size = raw.len() as u64;
        let client =
            MockHttpClient::new().with_response(&format!("{}/gfx01", ROOT), HttpResponse::ok(raw));
        let fetcher = fetcher_with(client);

        assert!(fetcher.fetch_bundle("gfx01", "abc", size).await.is_none());
        assert!(matches!(
            fetcher.try_fetch_bundle("gfx01", "abc", size).await,
            Err(FetchError::ChecksumMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_bundle_without_verification() {
        let raw = bundle_bytes();
        let client =
            MockHttpClient::new().with_response(&format!("{}/gfx01", ROOT), HttpResponse::ok(raw));
        let fetcher = fetcher_with(client).with_verify_checksums(false);

        assert!(fetcher.fetch_bundle("gfx01", "abc", 1).await.is_some());
    }

    #[tokio::test]
    async fn test_fetch_bundle_unparseable_payload() {
        let raw = b"this is not a bundle".to_vec();
        let checksum = sha256_hex(&raw);
        let size = raw.len() as u64;
        let client =
            MockHttpClient::new().with_response(&format!("{}/gfx01", ROOT), HttpResponse::ok(raw));
        let fetcher = fetcher_with(client);

        assert!(matches!(
            fetcher.try_fetch_bundle("gfx01", &checksum, size).await,
            Err(FetchError::InvalidBundle { .. })
        ));
        assert!(fetcher.fetch_bundle("gfx01", &checksum, size).await.is_none());
    }
}
