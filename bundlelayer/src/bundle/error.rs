//! Error types for bundle containers.

use std::io;

use thiserror::Error;

/// Result type for bundle container operations.
pub type BundleResult<T> = Result<T, BundleError>;

/// Errors that can occur while decoding or encoding a bundle container.
#[derive(Debug, Error)]
pub enum BundleError {
    /// The payload is shorter than the container header.
    #[error("bundle payload truncated: {0} bytes")]
    Truncated(usize),

    /// The payload does not start with the container magic.
    #[error("not a bundle container (bad magic)")]
    BadMagic,

    /// The container version is not understood.
    #[error("unsupported bundle format version {0}")]
    UnsupportedVersion(u8),

    /// The compressed section could not be inflated.
    #[error("failed to decompress bundle: {0}")]
    Decompress(#[source] io::Error),

    /// The decompressed section exceeds the decode limit.
    #[error("bundle contents exceed {limit} bytes")]
    TooLarge { limit: u64 },

    /// The entry table could not be decoded.
    #[error("failed to decode bundle entries: {0}")]
    Decode(#[source] bincode::Error),

    /// The entry table could not be encoded.
    #[error("failed to encode bundle entries: {0}")]
    Encode(#[source] bincode::Error),

    /// Compressing the entry table failed.
    #[error("failed to compress bundle: {0}")]
    Compress(#[source] io::Error),

    /// Two entries share a path.
    #[error("duplicate entry '{0}' in bundle")]
    DuplicateEntry(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            BundleError::UnsupportedVersion(9).to_string(),
            "unsupported bundle format version 9"
        );
        assert!(BundleError::TooLarge { limit: 42 }.to_string().contains("42"));
    }
}
