//! The provider interface.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast;

use super::error::ProviderResult;
use crate::bundle::{AssetHandle, Bundle, FileSystem, SceneHandle};
use crate::config::ProviderConfig;
use crate::fetch::BoxFuture;
use crate::jobs::JobInfo;
use crate::manifest::{BundleInfo, BundleLoad};

/// Callback invoked once when every job of an `ensure_bundles` call finished.
pub type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;

/// Where the authoritative manifest of a session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSource {
    /// Fetched from the remote root this session.
    Remote,
    /// The last remote manifest cached in the store.
    Cached,
    /// The manifest shipped under the local root.
    Embedded,
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remote => "remote",
            Self::Cached => "cached",
            Self::Embedded => "embedded",
        })
    }
}

/// Manifest-driven access to bundles and their assets.
///
/// # Lifecycle
///
/// Every operation except [`open`](Self::open), [`close`](Self::close),
/// [`is_open`](Self::is_open) and [`subscribe_completed`](Self::subscribe_completed)
/// returns [`ProviderError::Closed`](super::ProviderError::Closed) outside an
/// open session.
///
/// # Acquisition vs. loading
///
/// `ensure_*` operations acquire bundles; content operations (`get_*`,
/// `load_scene*`) only read what is already valid locally and never start a
/// transfer.
///
/// # Dyn Compatibility
///
/// Async methods return [`BoxFuture`] so the provider can be used as
/// `Arc<dyn AssetProvider>`.
pub trait AssetProvider: Send + Sync {
    /// Start a session: resolve the manifests and become servable.
    ///
    /// Opening an open provider closes the current session first.
    fn open(&self, config: ProviderConfig) -> BoxFuture<'_, ProviderResult<()>>;

    /// End the session: cancel outstanding jobs and release bundles.
    fn close(&self);

    /// Whether a session is open.
    fn is_open(&self) -> bool;

    /// Release tag of the current manifest.
    fn tag(&self) -> ProviderResult<String>;

    /// Build number of the current manifest.
    fn build(&self) -> ProviderResult<u32>;

    /// Manifest bundles that are not valid locally, dependencies first.
    fn get_invalidated_bundles(&self) -> ProviderResult<Vec<BundleInfo>>;

    /// Make sure a bundle is valid locally.
    ///
    /// Returns `None` when nothing needs to be fetched, otherwise the single
    /// in-flight job for that bundle name.
    fn ensure_bundle(&self, info: &BundleInfo) -> ProviderResult<Option<Arc<JobInfo>>>;

    /// Ensure a load request and its transitive dependencies.
    ///
    /// Jobs are queued dependencies first. `on_complete` runs exactly once,
    /// after every returned job reached a terminal status.
    fn ensure_bundles(
        &self,
        load: &BundleLoad,
        on_complete: CompletionCallback,
    ) -> ProviderResult<Vec<Arc<JobInfo>>>;

    /// Name of the bundle owning an asset path.
    fn find(&self, asset_path: &str) -> ProviderResult<Option<String>>;

    /// Whether the asset's owning bundle is available.
    fn is_asset_available(&self, asset_path: &str) -> ProviderResult<bool>;

    /// Whether some manifest bundle owns the asset, available or not.
    fn is_asset_exists(&self, asset_path: &str) -> ProviderResult<bool>;

    /// Whether a bundle is available locally.
    fn is_bundle_available(&self, name: &str) -> ProviderResult<bool>;

    /// Visit every in-flight job, oldest first.
    fn for_each_task(&self, visit: &mut dyn FnMut(&Arc<JobInfo>)) -> ProviderResult<()>;

    /// A loaded bundle.
    fn get_bundle<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ProviderResult<Arc<Bundle>>>;

    /// One asset from its owning bundle.
    fn get_asset<'a>(&'a self, asset_path: &'a str) -> BoxFuture<'a, ProviderResult<AssetHandle>>;

    /// File system view over a bundle.
    fn get_file_system<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Arc<dyn FileSystem>>>;

    /// Load a scene, replacing the active scenes.
    fn load_scene<'a>(&'a self, asset_path: &'a str) -> BoxFuture<'a, ProviderResult<SceneHandle>>;

    /// Load a scene on top of the active scenes.
    fn load_scene_additive<'a>(
        &'a self,
        asset_path: &'a str,
    ) -> BoxFuture<'a, ProviderResult<SceneHandle>>;

    /// Scenes loaded since the last single-mode load, oldest first.
    fn active_scenes(&self) -> ProviderResult<Vec<SceneHandle>>;

    /// Subscribe to the readiness notification fired once per session.
    fn subscribe_completed(&self) -> broadcast::Receiver<()>;
}
