//! CLI error type.

use std::io;
use std::path::PathBuf;

use bundlelayer::bundle::BundleError;
use bundlelayer::manifest::ManifestError;
use bundlelayer::ProviderError;

/// Errors surfaced by CLI commands.
#[derive(Debug)]
pub enum CliError {
    /// The provider rejected an operation.
    Provider(ProviderError),

    /// A manifest could not be built or written.
    Manifest(ManifestError),

    /// A bundle could not be encoded.
    Bundle(BundleError),

    /// A filesystem operation failed.
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    /// Some bundles did not reach the succeeded state.
    FetchFailed { failed: usize, total: usize },

    /// The pack input holds no bundle directories.
    EmptyInput(PathBuf),

    /// The load barrier went away before reporting.
    Interrupted,
}

impl CliError {
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// A follow-up suggestion shown under the error.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::FetchFailed { .. } => Some("re-run `bundlelayer fetch` to retry the failed bundles"),
            Self::EmptyInput(_) => Some("each bundle is a sub-directory of the input directory"),
            Self::Provider(ProviderError::Config(_)) => Some("check --local and --remote"),
            _ => None,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "{}", e),
            Self::Manifest(e) => write!(f, "{}", e),
            Self::Bundle(e) => write!(f, "failed to build bundle: {}", e),
            Self::Io {
                action,
                path,
                source,
            } => {
                write!(f, "failed to {} {}: {}", action, path.display(), source)
            }
            Self::FetchFailed { failed, total } => {
                write!(f, "{} of {} bundles could not be fetched", failed, total)
            }
            Self::EmptyInput(path) => {
                write!(f, "no bundle directories found in {}", path.display())
            }
            Self::Interrupted => write!(f, "load was interrupted before completing"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Provider(e) => Some(e),
            Self::Manifest(e) => Some(e),
            Self::Bundle(e) => Some(e),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        Self::Provider(e)
    }
}

impl From<ManifestError> for CliError {
    fn from(e: ManifestError) -> Self {
        Self::Manifest(e)
    }
}

impl From<BundleError> for CliError {
    fn from(e: BundleError) -> Self {
        Self::Bundle(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_failed_display_and_hint() {
        let err = CliError::FetchFailed {
            failed: 2,
            total: 5,
        };
        assert_eq!(err.to_string(), "2 of 5 bundles could not be fetched");
        assert!(err.hint().is_some());
    }

    #[test]
    fn test_io_has_source() {
        use std::error::Error;

        let err = CliError::io(
            "read",
            "/tmp/x",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("failed to read /tmp/x"));
    }
}
