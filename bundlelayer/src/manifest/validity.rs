//! Local validity checks.
//!
//! A bundle is valid locally only when a local copy exists whose checksum and
//! size both match the authoritative manifest entry exactly. A name match with
//! either field differing counts as invalid.

use std::sync::Arc;

use super::types::BundleInfo;

/// Answers whether an exact copy of a bundle is present locally.
///
/// Implementations are read-only after construction and must be safe to
/// query concurrently.
pub trait LocalValidityChecker: Send + Sync {
    /// Returns true only if `name` is known locally with exactly this
    /// `checksum` and `size`.
    fn is_valid(&self, name: &str, checksum: &str, size: u64) -> bool;

    /// Convenience wrapper taking a manifest entry.
    fn is_valid_info(&self, info: &BundleInfo) -> bool {
        self.is_valid(&info.name, &info.checksum, info.size)
    }
}

impl<T: LocalValidityChecker + ?Sized> LocalValidityChecker for Arc<T> {
    fn is_valid(&self, name: &str, checksum: &str, size: u64) -> bool {
        (**self).is_valid(name, checksum, size)
    }
}

/// Any-of composite over several local sources.
///
/// Valid when at least one source holds an exact copy. With no sources,
/// nothing is valid.
#[derive(Clone, Default)]
pub struct LocalValidity {
    sources: Vec<Arc<dyn LocalValidityChecker>>,
}

impl LocalValidity {
    /// Create an empty composite.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source.
    pub fn with_source(mut self, source: Arc<dyn LocalValidityChecker>) -> Self {
        self.sources.push(source);
        self
    }

    /// Number of sources consulted.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

impl LocalValidityChecker for LocalValidity {
    fn is_valid(&self, name: &str, checksum: &str, size: u64) -> bool {
        self.sources
            .iter()
            .any(|source| source.is_valid(name, checksum, size))
    }
}

impl std::fmt::Debug for LocalValidity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalValidity")
            .field("sources", &self.sources.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct MapChecker(HashMap<String, (String, u64)>);

    impl MapChecker {
        fn with(entries: &[(&str, &str, u64)]) -> Self {
            Self(
                entries
                    .iter()
                    .map(|(n, c, s)| (n.to_string(), (c.to_string(), *s)))
                    .collect(),
            )
        }
    }

    impl LocalValidityChecker for MapChecker {
        fn is_valid(&self, name: &str, checksum: &str, size: u64) -> bool {
            self.0
                .get(name)
                .is_some_and(|(c, s)| c == checksum && *s == size)
        }
    }

    #[test]
    fn test_empty_composite_is_never_valid() {
        let validity = LocalValidity::new();
        assert_eq!(validity.source_count(), 0);
        assert!(!validity.is_valid("gfx01", "abc", 1000));
    }

    #[test]
    fn test_composite_any_source_matches() {
        let embedded = Arc::new(MapChecker::with(&[("gfx01", "abc", 1000)]));
        let store = Arc::new(MapChecker::with(&[("gfx02", "def", 2000)]));
        let validity = LocalValidity::new()
            .with_source(embedded)
            .with_source(store);

        assert!(validity.is_valid("gfx01", "abc", 1000));
        assert!(validity.is_valid("gfx02", "def", 2000));
        assert!(!validity.is_valid("gfx02", "def", 1999));
        assert!(!validity.is_valid("gfx03", "abc", 1000));
    }

    #[test]
    fn test_is_valid_info() {
        let checker = MapChecker::with(&[("gfx01", "abc", 1000)]);
        assert!(checker.is_valid_info(&BundleInfo::new("gfx01", "abc", 1000)));
        assert!(!checker.is_valid_info(&BundleInfo::new("gfx01", "abd", 1000)));
    }
}
