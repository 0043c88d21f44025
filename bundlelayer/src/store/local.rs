//! On-disk store of acquired bundles.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::{StoreError, StoreResult};
use crate::fetch::sha256_hex;
use crate::manifest::{LocalValidityChecker, Manifest, MANIFEST_FILE_NAME};

/// Sub-directory holding the bundle files.
const BUNDLES_DIR: &str = "bundles";

/// Index file mapping bundle names to what is on disk.
const INDEX_FILE_NAME: &str = "index.json";

/// What the store holds for one bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredBundle {
    /// Lowercase hex SHA-256 of the stored file.
    pub checksum: String,
    /// Length of the stored file in bytes.
    pub size: u64,
    /// Unix timestamp (seconds) of the write.
    pub stored_at: i64,
}

/// Bundles fetched in earlier sessions, persisted keyed by name.
///
/// # Layout
///
/// ```text
/// <root>/
///   index.json        name → StoredBundle
///   manifest.json     last remote manifest fetched successfully
///   bundles/<name>    raw bundle file
/// ```
///
/// The index is held in memory and rewritten on every change. Files are
/// written to a temporary sibling and renamed into place, so a crash leaves
/// either the old or the new content.
#[derive(Debug)]
pub struct LocalBundleStore {
    root: PathBuf,
    index: RwLock<HashMap<String, StoredBundle>>,
    /// Serializes index rewrites.
    persist: tokio::sync::Mutex<()>,
}

impl LocalBundleStore {
    /// Open (creating if needed) the store rooted at `root`.
    ///
    /// Index entries whose file is missing or has the wrong length are
    /// dropped. An unreadable or corrupt index starts the store empty.
    ///
    /// # Errors
    ///
    /// Returns an error when the store directories cannot be created.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        let bundles_dir = root.join(BUNDLES_DIR);
        tokio::fs::create_dir_all(&bundles_dir)
            .await
            .map_err(|e| StoreError::io(&bundles_dir, e))?;

        let loaded = read_index(&root.join(INDEX_FILE_NAME)).await;
        let mut index = HashMap::with_capacity(loaded.len());
        for (name, entry) in loaded {
            if !is_valid_name(&name) {
                warn!(bundle = %name, "Dropping store entry with unusable name");
                continue;
            }
            match tokio::fs::metadata(bundles_dir.join(&name)).await {
                Ok(meta) if meta.len() == entry.size => {
                    index.insert(name, entry);
                }
                Ok(meta) => {
                    warn!(
                        bundle = %name,
                        expected = entry.size,
                        actual = meta.len(),
                        "Dropping store entry with wrong length on disk"
                    );
                }
                Err(_) => {
                    warn!(bundle = %name, "Dropping store entry with missing file");
                }
            }
        }

        info!(root = %root.display(), bundles = index.len(), "Bundle store opened");

        Ok(Self {
            root,
            index: RwLock::new(index),
            persist: tokio::sync::Mutex::new(()),
        })
    }

    /// Store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file for bundle `name`.
    pub fn bundle_path(&self, name: &str) -> PathBuf {
        self.root.join(BUNDLES_DIR).join(name)
    }

    /// Index entry for `name`.
    pub fn get(&self, name: &str) -> Option<StoredBundle> {
        self.index.read().get(name).cloned()
    }

    /// Whether anything is stored under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.index.read().contains_key(name)
    }

    /// Stored bundle names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.index.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of stored bundles.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Persist `data` as bundle `name`, replacing any previous copy.
    ///
    /// The index records the checksum and length of the bytes actually
    /// written.
    pub async fn put(&self, name: &str, data: &[u8]) -> StoreResult<StoredBundle> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        write_atomic(&self.bundle_path(name), data).await?;

        let entry = StoredBundle {
            checksum: sha256_hex(data),
            size: data.len() as u64,
            stored_at: Utc::now().timestamp(),
        };
        self.index.write().insert(name.to_string(), entry.clone());
        self.persist_index().await?;

        debug!(bundle = %name, size = entry.size, "Bundle stored");
        Ok(entry)
    }

    /// Read the stored bytes of `name`.
    ///
    /// Returns `None` when nothing is stored. A file that vanished or changed
    /// length since it was indexed is dropped from the index.
    pub async fn read(&self, name: &str) -> StoreResult<Option<Bytes>> {
        let Some(entry) = self.get(name) else {
            return Ok(None);
        };

        let path = self.bundle_path(name);
        match tokio::fs::read(&path).await {
            Ok(data) if data.len() as u64 == entry.size => Ok(Some(Bytes::from(data))),
            Ok(_) => {
                warn!(bundle = %name, "Stored bundle changed on disk");
                self.forget(name).await?;
                Ok(None)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(bundle = %name, "Stored bundle missing on disk");
                self.forget(name).await?;
                Ok(None)
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Delete bundle `name` from disk and index.
    pub async fn remove(&self, name: &str) -> StoreResult<bool> {
        if !is_valid_name(name) {
            return Err(StoreError::InvalidName(name.to_string()));
        }

        let path = self.bundle_path(name);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(StoreError::io(path, e)),
        }
        self.forget(name).await
    }

    /// Cache a manifest as the last known remote manifest.
    pub async fn save_manifest(&self, manifest: &Manifest) -> StoreResult<()> {
        let json = manifest.to_json()?;
        write_atomic(&self.root.join(MANIFEST_FILE_NAME), json.as_bytes()).await
    }

    /// The cached remote manifest, if one was saved.
    pub async fn load_manifest(&self) -> StoreResult<Option<Manifest>> {
        let path = self.root.join(MANIFEST_FILE_NAME);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Manifest::from_slice(&data)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn forget(&self, name: &str) -> StoreResult<bool> {
        let removed = self.index.write().remove(name).is_some();
        if removed {
            self.persist_index().await?;
        }
        Ok(removed)
    }

    async fn persist_index(&self) -> StoreResult<()> {
        let _guard = self.persist.lock().await;
        // Snapshot under the guard so the last writer persists the newest state.
        let json = {
            let index = self.index.read();
            serde_json::to_vec_pretty(&*index)?
        };
        write_atomic(&self.root.join(INDEX_FILE_NAME), &json).await
    }
}

impl LocalValidityChecker for LocalBundleStore {
    fn is_valid(&self, name: &str, checksum: &str, size: u64) -> bool {
        self.index
            .read()
            .get(name)
            .is_some_and(|entry| entry.size == size && entry.checksum == checksum)
    }
}

/// A name usable as a single file name inside the bundles directory.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.starts_with(".~")
}

async fn read_index(path: &Path) -> HashMap<String, StoredBundle> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return HashMap::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Store index unreadable; starting empty");
            return HashMap::new();
        }
    };

    match serde_json::from_slice(&data) {
        Ok(index) => index,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Store index corrupt; starting empty");
            HashMap::new()
        }
    }
}

/// Write through a temporary sibling, then rename into place.
async fn write_atomic(path: &Path, data: &[u8]) -> StoreResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".~{}.tmp", file_name));

    tokio::fs::write(&temp, data)
        .await
        .map_err(|e| StoreError::io(&temp, e))?;
    tokio::fs::rename(&temp, path)
        .await
        .map_err(|e| StoreError::io(path, e))
}
