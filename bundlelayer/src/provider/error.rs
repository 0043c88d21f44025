//! Error types for the asset provider.

use thiserror::Error;

use crate::bundle::BundleError;
use crate::fetch::FetchError;
use crate::store::StoreError;

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors returned by [`AssetProvider`](super::AssetProvider) operations.
///
/// `Closed`, `BundleUnknown`, `BundleUnavailable` and `AssetNotFound` are
/// caller errors: the operation was invoked outside the open bracket or
/// before the content was acquired. Acquisition itself never returns an
/// error through this type; failed transfers are reported on the job.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider is not open.
    #[error("provider is closed")]
    Closed,

    /// The current manifest does not list the bundle.
    #[error("bundle '{0}' is not in the manifest")]
    BundleUnknown(String),

    /// The bundle is listed but not valid locally.
    #[error("bundle '{0}' is not available locally")]
    BundleUnavailable(String),

    /// No bundle in the manifest owns the asset, or its owner lacks the file.
    #[error("asset '{0}' not found")]
    AssetNotFound(String),

    /// The local store failed.
    #[error("bundle store error: {0}")]
    Store(#[from] StoreError),

    /// A transfer failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Stored bytes no longer parse as a bundle.
    #[error("stored bundle is corrupt: {0}")]
    Bundle(#[from] BundleError),

    /// The provider could not be set up.
    #[error("invalid provider configuration: {0}")]
    Config(String),
}
