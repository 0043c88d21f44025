//! Error types for the local bundle store.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::ManifestError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while reading or writing the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A filesystem operation failed.
    #[error("store I/O failed at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The bundle name cannot be used as a file name.
    #[error("invalid bundle name '{0}'")]
    InvalidName(String),

    /// The index could not be encoded.
    #[error("failed to encode store index: {0}")]
    Index(#[from] serde_json::Error),

    /// The cached manifest could not be encoded or decoded.
    #[error("cached manifest unusable: {0}")]
    Manifest(#[from] ManifestError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
