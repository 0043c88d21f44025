//! Error types for bundle fetching.

use thiserror::Error;

use crate::bundle::BundleError;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors that can occur while fetching a bundle or manifest.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The transport reported an error.
    #[error("request to {uri} failed: {reason}")]
    Transport { uri: String, reason: String },

    /// The transport gave up waiting.
    #[error("request to {uri} timed out after {timeout_secs}s")]
    Timeout { uri: String, timeout_secs: u64 },

    /// The transport completed with a non-success status.
    #[error("request to {uri} returned status {status}")]
    Status { uri: String, status: u16 },

    /// The payload length differs from the manifest entry.
    #[error("size mismatch for {name}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    /// The payload digest differs from the manifest entry.
    #[error("checksum mismatch for {name}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    /// The payload is not a valid bundle container.
    #[error("invalid bundle {name}: {source}")]
    InvalidBundle {
        name: String,
        #[source]
        source: BundleError,
    },

    /// The HTTP client could not be constructed.
    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = FetchError::Status {
            uri: "https://cdn/gfx01".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "request to https://cdn/gfx01 returned status 404"
        );
    }

    #[test]
    fn test_invalid_bundle_has_source() {
        use std::error::Error;

        let err = FetchError::InvalidBundle {
            name: "gfx01".to_string(),
            source: BundleError::BadMagic,
        };
        assert!(err.source().is_some());
        assert!(err.to_string().contains("gfx01"));
    }
}
