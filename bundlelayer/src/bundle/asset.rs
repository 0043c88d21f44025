//! Handles to assets and scenes served from loaded bundles.

use bytes::Bytes;

/// One asset read out of a loaded bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetHandle {
    path: String,
    bundle: String,
    data: Bytes,
}

impl AssetHandle {
    /// Create a handle.
    pub fn new(path: impl Into<String>, bundle: impl Into<String>, data: Bytes) -> Self {
        Self {
            path: path.into(),
            bundle: bundle.into(),
            data,
        }
    }

    /// Logical asset path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the owning bundle.
    pub fn bundle(&self) -> &str {
        &self.bundle
    }

    /// Asset contents.
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

/// How a scene joins the active scene list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneLoadMode {
    /// Replaces every active scene.
    Single,
    /// Added alongside the active scenes.
    Additive,
}

/// A scene that has been loaded from an available bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneHandle {
    asset: AssetHandle,
    mode: SceneLoadMode,
}

impl SceneHandle {
    /// Create a scene handle from its asset.
    pub fn new(asset: AssetHandle, mode: SceneLoadMode) -> Self {
        Self { asset, mode }
    }

    /// Scene asset path.
    pub fn path(&self) -> &str {
        self.asset.path()
    }

    /// Name of the owning bundle.
    pub fn bundle(&self) -> &str {
        self.asset.bundle()
    }

    /// The scene asset.
    pub fn asset(&self) -> &AssetHandle {
        &self.asset
    }

    /// How the scene was loaded.
    pub fn mode(&self) -> SceneLoadMode {
        self.mode
    }
}
