//! Error types for manifest parsing and loading.

use thiserror::Error;

use crate::fetch::FetchError;

/// Result type for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while loading or validating a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The payload is not a valid manifest document.
    #[error("failed to parse manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// A bundle entry has an empty name.
    #[error("manifest contains a bundle with an empty name")]
    EmptyName,

    /// Two bundle entries share a name.
    #[error("duplicate bundle '{0}' in manifest")]
    DuplicateBundle(String),

    /// The dependency graph is not acyclic.
    #[error("dependency cycle through bundle '{0}'")]
    DependencyCycle(String),

    /// The manifest could not be fetched.
    #[error("failed to fetch manifest: {0}")]
    Fetch(#[from] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_bundle_display() {
        let err = ManifestError::DuplicateBundle("gfx01".to_string());
        assert_eq!(err.to_string(), "duplicate bundle 'gfx01' in manifest");
    }

    #[test]
    fn test_parse_error_from_serde() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ManifestError = serde_err.into();
        assert!(matches!(err, ManifestError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse manifest"));
    }
}
