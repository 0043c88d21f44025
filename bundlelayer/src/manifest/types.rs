//! Core manifest data types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{ManifestError, ManifestResult};

/// One bundle entry of a manifest.
///
/// Immutable once parsed. The `name` is the unique key within a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    /// Unique bundle name, also the file name under a root.
    pub name: String,

    /// Lowercase hex SHA-256 of the bundle file.
    #[serde(default)]
    pub checksum: String,

    /// Size of the bundle file in bytes.
    #[serde(default)]
    pub size: u64,

    /// Names of bundles this bundle depends on, in declaration order.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Logical asset paths owned by this bundle.
    #[serde(default)]
    pub assets: Vec<String>,
}

impl BundleInfo {
    /// Create a bundle entry without dependencies or assets.
    pub fn new(name: impl Into<String>, checksum: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            checksum: checksum.into(),
            size,
            dependencies: Vec::new(),
            assets: Vec::new(),
        }
    }

    /// Add a dependency.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Add an owned asset path.
    pub fn with_asset(mut self, path: impl Into<String>) -> Self {
        self.assets.push(path.into());
        self
    }
}

/// On-disk shape of a manifest document.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    build: u32,
    #[serde(default)]
    tag: String,
    #[serde(default)]
    bundles: Vec<BundleInfo>,
}

/// A versioned snapshot of the bundles that should exist.
///
/// Bundles keep their declared order. Name and asset lookups go through
/// indices built once at construction.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    build: u32,
    tag: String,
    bundles: Vec<BundleInfo>,
    by_name: HashMap<String, usize>,
    by_asset: HashMap<String, usize>,
}

impl Manifest {
    /// Build a manifest from its parts.
    ///
    /// # Errors
    ///
    /// Fails on an empty or duplicate bundle name, or on a dependency cycle.
    /// Dependencies on bundles the manifest does not list are logged and
    /// ignored during resolution.
    pub fn new(build: u32, tag: impl Into<String>, bundles: Vec<BundleInfo>) -> ManifestResult<Self> {
        let mut by_name = HashMap::with_capacity(bundles.len());
        for (index, bundle) in bundles.iter().enumerate() {
            if bundle.name.is_empty() {
                return Err(ManifestError::EmptyName);
            }
            if by_name.insert(bundle.name.clone(), index).is_some() {
                return Err(ManifestError::DuplicateBundle(bundle.name.clone()));
            }
        }

        let mut by_asset: HashMap<String, usize> = HashMap::new();
        for (index, bundle) in bundles.iter().enumerate() {
            for dep in &bundle.dependencies {
                if !by_name.contains_key(dep) {
                    warn!(bundle = %bundle.name, dependency = %dep, "Manifest lists unknown dependency");
                }
            }
            for asset in &bundle.assets {
                if let Some(&owner) = by_asset.get(asset) {
                    warn!(
                        asset = %asset,
                        owner = %bundles[owner].name,
                        bundle = %bundle.name,
                        "Asset claimed by more than one bundle; keeping first owner"
                    );
                    continue;
                }
                by_asset.insert(asset.clone(), index);
            }
        }

        let manifest = Self {
            build,
            tag: tag.into(),
            bundles,
            by_name,
            by_asset,
        };

        if let Some(name) = manifest.find_cycle() {
            return Err(ManifestError::DependencyCycle(name));
        }

        Ok(manifest)
    }

    /// Parse a manifest from JSON text.
    pub fn from_json(json: &str) -> ManifestResult<Self> {
        let file: ManifestFile = serde_json::from_str(json)?;
        Self::new(file.build, file.tag, file.bundles)
    }

    /// Parse a manifest from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> ManifestResult<Self> {
        let file: ManifestFile = serde_json::from_slice(bytes)?;
        Self::new(file.build, file.tag, file.bundles)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> ManifestResult<String> {
        let file = ManifestFile {
            build: self.build,
            tag: self.tag.clone(),
            bundles: self.bundles.clone(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Monotonic build number.
    pub fn build(&self) -> u32 {
        self.build
    }

    /// Free-form release tag.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Bundles in declared order.
    pub fn bundles(&self) -> &[BundleInfo] {
        &self.bundles
    }

    /// Number of bundles.
    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    /// Whether the manifest lists no bundles.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    /// Look up a bundle by name.
    pub fn get(&self, name: &str) -> Option<&BundleInfo> {
        self.by_name.get(name).map(|&i| &self.bundles[i])
    }

    /// Check whether a bundle is listed.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Find the bundle that owns a logical asset path.
    pub fn find_asset(&self, asset_path: &str) -> Option<&BundleInfo> {
        self.by_asset.get(asset_path).map(|&i| &self.bundles[i])
    }

    /// All bundles, dependencies first.
    ///
    /// Follows declared order except where a bundle is declared before one of
    /// its dependencies; the dependency is then pulled forward.
    pub fn dependency_order(&self) -> Vec<&BundleInfo> {
        self.walk(0..self.bundles.len())
    }

    /// The transitive dependency closure of the named bundles, dependencies
    /// before dependents, each bundle once.
    ///
    /// Names the manifest does not list are skipped.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Vec<&BundleInfo> {
        let roots = names
            .iter()
            .filter_map(|n| self.by_name.get(n.as_ref()).copied())
            .collect::<Vec<_>>();
        self.walk(roots)
    }

    /// Iterative post-order walk from the given roots.
    fn walk(&self, roots: impl IntoIterator<Item = usize>) -> Vec<&BundleInfo> {
        // 0 = unvisited, 1 = on stack, 2 = emitted
        let mut marks = vec![0u8; self.bundles.len()];
        let mut out = Vec::new();
        for root in roots {
            if marks[root] != 0 {
                continue;
            }
            let mut stack = vec![(root, 0usize)];
            marks[root] = 1;
            while let Some((index, next_dep)) = stack.pop() {
                let deps = &self.bundles[index].dependencies;
                if next_dep == deps.len() {
                    marks[index] = 2;
                    out.push(&self.bundles[index]);
                    continue;
                }
                stack.push((index, next_dep + 1));
                if let Some(&dep_index) = self.by_name.get(&deps[next_dep]) {
                    if marks[dep_index] == 0 {
                        marks[dep_index] = 1;
                        stack.push((dep_index, 0));
                    }
                }
            }
        }
        out
    }

    /// Name of a bundle on a dependency cycle, if any.
    fn find_cycle(&self) -> Option<String> {
        // 0 = unvisited, 1 = on stack, 2 = finished
        let mut marks = vec![0u8; self.bundles.len()];
        for start in 0..self.bundles.len() {
            if marks[start] != 0 {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            marks[start] = 1;
            while let Some((index, next_dep)) = stack.pop() {
                let deps = &self.bundles[index].dependencies;
                if next_dep == deps.len() {
                    marks[index] = 2;
                    continue;
                }
                stack.push((index, next_dep + 1));
                let Some(&dep_index) = self.by_name.get(&deps[next_dep]) else {
                    continue;
                };
                match marks[dep_index] {
                    0 => {
                        marks[dep_index] = 1;
                        stack.push((dep_index, 0));
                    }
                    1 => return Some(self.bundles[dep_index].name.clone()),
                    _ => {}
                }
            }
        }
        None
    }
}

/// A request to acquire a set of bundles together with their dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleLoad {
    bundles: Vec<String>,
}

impl BundleLoad {
    /// Create a load request for the given bundle names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            bundles: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a load request for a single bundle.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            bundles: vec![name.into()],
        }
    }

    /// Add another bundle to the request.
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.bundles.push(name.into());
        self
    }

    /// Requested bundle names, in request order.
    pub fn names(&self) -> &[String] {
        &self.bundles
    }

    /// Whether the request names no bundles.
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }
}
