//! Bundle container decoding and encoding.

use std::collections::BTreeMap;
use std::io::{Read, Write};

use bincode::Options;
use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use super::error::{BundleError, BundleResult};

/// Magic bytes at the start of every bundle file.
pub const BUNDLE_MAGIC: &[u8; 4] = b"UBFS";

/// Container format version written by [`BundleBuilder`].
pub const BUNDLE_FORMAT_VERSION: u8 = 1;

/// Header length: magic plus version byte.
const HEADER_LEN: usize = 5;

/// Upper bound on the decompressed entry table (1 GiB).
const MAX_DECODED_BYTES: u64 = 1024 * 1024 * 1024;

#[derive(Serialize, Deserialize)]
struct ArchiveEntry {
    path: String,
    data: Vec<u8>,
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_DECODED_BYTES)
}

/// A parsed bundle.
///
/// Holds the decoded entries keyed by asset path and the raw container bytes
/// it was parsed from, so the exact payload can be persisted.
#[derive(Debug, Clone)]
pub struct Bundle {
    name: String,
    entries: BTreeMap<String, Bytes>,
    raw: Bytes,
}

impl Bundle {
    /// Parse a bundle container.
    ///
    /// # Errors
    ///
    /// Fails on a short or foreign header, a corrupt compressed section, an
    /// undecodable entry table, or duplicate entry paths.
    pub fn parse(name: impl Into<String>, raw: Bytes) -> BundleResult<Self> {
        if raw.len() < HEADER_LEN {
            return Err(BundleError::Truncated(raw.len()));
        }
        if &raw[..4] != BUNDLE_MAGIC {
            return Err(BundleError::BadMagic);
        }
        if raw[4] != BUNDLE_FORMAT_VERSION {
            return Err(BundleError::UnsupportedVersion(raw[4]));
        }

        let mut decoded = Vec::new();
        GzDecoder::new(&raw[HEADER_LEN..])
            .take(MAX_DECODED_BYTES + 1)
            .read_to_end(&mut decoded)
            .map_err(BundleError::Decompress)?;
        if decoded.len() as u64 > MAX_DECODED_BYTES {
            return Err(BundleError::TooLarge {
                limit: MAX_DECODED_BYTES,
            });
        }

        let archive: Vec<ArchiveEntry> = codec()
            .deserialize(&decoded)
            .map_err(BundleError::Decode)?;

        let mut entries = BTreeMap::new();
        for entry in archive {
            if entries.contains_key(&entry.path) {
                return Err(BundleError::DuplicateEntry(entry.path));
            }
            entries.insert(entry.path, Bytes::from(entry.data));
        }

        Ok(Self {
            name: name.into(),
            entries,
            raw,
        })
    }

    /// Bundle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The container bytes this bundle was parsed from.
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Size of the container in bytes.
    pub fn size(&self) -> u64 {
        self.raw.len() as u64
    }

    /// Contents of one entry.
    pub fn entry(&self, path: &str) -> Option<&Bytes> {
        self.entries.get(path)
    }

    /// Whether an entry exists.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Entry paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds bundle container bytes.
///
/// # Example
///
/// ```
/// use bundlelayer::bundle::{Bundle, BundleBuilder};
///
/// let raw = BundleBuilder::new()
///     .with_entry("gfx/hero.png", b"png".to_vec())
///     .build()
///     .unwrap();
/// let bundle = Bundle::parse("gfx01", raw.into()).unwrap();
/// assert!(bundle.contains("gfx/hero.png"));
/// ```
#[derive(Debug, Default)]
pub struct BundleBuilder {
    entries: Vec<ArchiveEntry>,
}

impl std::fmt::Debug for ArchiveEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("path", &self.path)
            .field("len", &self.data.len())
            .finish()
    }
}

impl BundleBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style.
    pub fn with_entry(mut self, path: impl Into<String>, data: Vec<u8>) -> Self {
        self.add_entry(path, data);
        self
    }

    /// Add an entry.
    pub fn add_entry(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.entries.push(ArchiveEntry {
            path: path.into(),
            data,
        });
    }

    /// Number of entries added so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were added.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encode the container.
    pub fn build(self) -> BundleResult<Vec<u8>> {
        let encoded = codec()
            .serialize(&self.entries)
            .map_err(BundleError::Encode)?;

        let mut out = Vec::with_capacity(HEADER_LEN + encoded.len() / 2);
        out.extend_from_slice(BUNDLE_MAGIC);
        out.push(BUNDLE_FORMAT_VERSION);

        let mut encoder = GzEncoder::new(out, Compression::default());
        encoder.write_all(&encoded).map_err(BundleError::Compress)?;
        encoder.finish().map_err(BundleError::Compress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> Vec<u8> {
        BundleBuilder::new()
            .with_entry("gfx/hero.png", vec![1, 2, 3])
            .with_entry("scenes/intro.scene", b"scene".to_vec())
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_built_bundle() {
        let raw = sample_raw();
        let bundle = Bundle::parse("gfx01", Bytes::from(raw.clone())).unwrap();

        assert_eq!(bundle.name(), "gfx01");
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.size(), raw.len() as u64);
        assert_eq!(bundle.entry("gfx/hero.png").unwrap().as_ref(), &[1, 2, 3]);
        assert_eq!(
            bundle.paths().collect::<Vec<_>>(),
            vec!["gfx/hero.png", "scenes/intro.scene"]
        );
        assert!(!bundle.contains("missing"));
    }

    #[test]
    fn test_empty_bundle() {
        let raw = BundleBuilder::new().build().unwrap();
        let bundle = Bundle::parse("empty", Bytes::from(raw)).unwrap();
        assert!(bundle.is_empty());
    }

    #[test]
    fn test_truncated_payload() {
        let result = Bundle::parse("x", Bytes::from_static(b"UBF"));
        assert!(matches!(result, Err(BundleError::Truncated(3))));
    }

    #[test]
    fn test_bad_magic() {
        let result = Bundle::parse("x", Bytes::from_static(b"PK\x03\x04\x01rest"));
        assert!(matches!(result, Err(BundleError::BadMagic)));
    }

    #[test]
    fn test_unsupported_version() {
        let mut raw = sample_raw();
        raw[4] = 9;
        let result = Bundle::parse("x", Bytes::from(raw));
        assert!(matches!(result, Err(BundleError::UnsupportedVersion(9))));
    }

    #[test]
    fn test_corrupt_body() {
        let mut raw = b"UBFS\x01".to_vec();
        raw.extend_from_slice(b"definitely not gzip");
        let result = Bundle::parse("x", Bytes::from(raw));
        assert!(matches!(result, Err(BundleError::Decompress(_))));
    }

    #[test]
    fn test_gzip_of_garbage_fails_decode() {
        let mut encoder = GzEncoder::new(b"UBFS\x01".to_vec(), Compression::default());
        encoder.write_all(&[0xff; 16]).unwrap();
        let raw = encoder.finish().unwrap();

        let result = Bundle::parse("x", Bytes::from(raw));
        assert!(matches!(result, Err(BundleError::Decode(_))));
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let raw = BundleBuilder::new()
            .with_entry("a.txt", vec![1])
            .with_entry("a.txt", vec![2])
            .build()
            .unwrap();
        let result = Bundle::parse("x", Bytes::from(raw));
        assert!(matches!(result, Err(BundleError::DuplicateEntry(p)) if p == "a.txt"));
    }
}
