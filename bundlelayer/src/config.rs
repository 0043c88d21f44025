//! Configuration for the bundle acquisition provider.

use std::path::PathBuf;
use std::time::Duration;

/// Default HTTP request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of bundle transfers allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 4;

/// Name of the store directory created under the user cache directory.
const STORE_DIR_NAME: &str = "bundlelayer";

/// Arguments handed to [`AssetProvider::open`](crate::provider::AssetProvider::open).
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Root holding the bundles shipped with the application.
    ///
    /// A plain filesystem path or a URI. The embedded `manifest.json` is read
    /// from here.
    pub local_root: String,

    /// Root URI of the remote bundle server, if any.
    ///
    /// When set, the remote `manifest.json` is authoritative and invalid
    /// bundles are fetched from here.
    pub remote_root: Option<String>,

    /// Directory where fetched bundles are persisted.
    pub store_dir: PathBuf,

    /// Transport timeout for a single request.
    pub timeout: Duration,

    /// Maximum concurrent bundle transfers.
    pub max_concurrent_downloads: usize,

    /// Whether fetched payloads are re-checked against the manifest size and
    /// checksum before they are accepted.
    pub verify_checksums: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            local_root: String::from("."),
            remote_root: None,
            store_dir: default_store_dir(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            verify_checksums: true,
        }
    }
}

impl ProviderConfig {
    /// Create a new configuration reading embedded bundles from `local_root`.
    pub fn new(local_root: impl Into<String>) -> Self {
        Self {
            local_root: local_root.into(),
            ..Default::default()
        }
    }

    /// Set the remote root URI.
    pub fn with_remote_root(mut self, uri: impl Into<String>) -> Self {
        self.remote_root = Some(uri.into());
        self
    }

    /// Set the store directory.
    pub fn with_store_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_dir = path.into();
        self
    }

    /// Set the transport timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum concurrent transfers (at least one).
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    /// Enable or disable post-fetch checksum verification.
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

/// Default store directory: the user cache directory, or the system temp
/// directory when none exists.
pub fn default_store_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(STORE_DIR_NAME)
}

/// Convert a root given as a filesystem path into a `file://` URI.
///
/// Roots that already carry a scheme are returned unchanged.
pub fn to_root_uri(root: &str) -> String {
    if root.contains("://") {
        root.to_string()
    } else {
        format!("file://{}", root)
    }
}
