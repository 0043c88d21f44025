//! Read-only file system view over bundle contents.

use bytes::Bytes;

use super::container::Bundle;

/// Read-only access to the files inside a loaded bundle.
pub trait FileSystem: Send + Sync {
    /// Whether a file exists.
    fn exists(&self, path: &str) -> bool;

    /// Full contents of a file.
    fn read_all_bytes(&self, path: &str) -> Option<Bytes>;

    /// Contents of a file decoded as UTF-8.
    ///
    /// Returns `None` when the file is missing or not valid UTF-8.
    fn read_all_text(&self, path: &str) -> Option<String> {
        self.read_all_bytes(path)
            .and_then(|bytes| String::from_utf8(bytes.to_vec()).ok())
    }

    /// All file paths.
    fn files(&self) -> Vec<String>;
}

impl FileSystem for Bundle {
    fn exists(&self, path: &str) -> bool {
        self.contains(path)
    }

    fn read_all_bytes(&self, path: &str) -> Option<Bytes> {
        self.entry(path).cloned()
    }

    fn files(&self) -> Vec<String> {
        self.paths().map(str::to_string).collect()
    }
}
