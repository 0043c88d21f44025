//! Manifest-driven bundle acquisition provider.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::{broadcast, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::{ProviderError, ProviderResult};
use super::traits::{AssetProvider, CompletionCallback, ManifestSource};
use crate::bundle::{AssetHandle, Bundle, FileSystem, SceneHandle, SceneLoadMode};
use crate::config::ProviderConfig;
use crate::fetch::{verify_payload, AsyncHttpClient, BoxFuture, BundleFetcher, ReqwestClient};
use crate::jobs::{wait_all, JobEntry, JobInfo, JobTable};
use crate::manifest::{
    BundleInfo, BundleLoad, EmbeddedManifest, LocalValidity, LocalValidityChecker, Manifest,
    MANIFEST_FILE_NAME,
};
use crate::store::LocalBundleStore;

/// Buffered readiness notifications per subscriber.
const COMPLETED_CHANNEL_CAPACITY: usize = 16;

enum ProviderState {
    Closed,
    Open(Arc<Session>),
}

/// Everything owned by one open/close bracket.
///
/// The manifest snapshot is fixed for the session; a new one only arrives
/// with a new session.
struct Session {
    manifest: Arc<Manifest>,
    manifest_source: ManifestSource,
    embedded: Arc<EmbeddedManifest>,
    store: Arc<LocalBundleStore>,
    validity: LocalValidity,
    local: BundleFetcher,
    remote: Option<BundleFetcher>,
    jobs: JobTable,
    loaded: DashMap<String, Arc<Bundle>>,
    scenes: Mutex<Vec<SceneHandle>>,
    token: CancellationToken,
    transfers: Semaphore,
    runtime: Handle,
    verify_checksums: bool,
}

impl Session {
    /// Valid locally, or fetched and loaded this session.
    fn is_available(&self, info: &BundleInfo) -> bool {
        self.loaded.contains_key(&info.name) || self.validity.is_valid_info(info)
    }

    /// Where invalid bundles are fetched from.
    fn source(&self) -> &BundleFetcher {
        self.remote.as_ref().unwrap_or(&self.local)
    }

    fn ensure(self: &Arc<Self>, info: &BundleInfo) -> Option<Arc<JobInfo>> {
        if self.is_available(info) {
            debug!(bundle = %info.name, "Bundle valid locally");
            return None;
        }

        match self.jobs.get_or_create(info, &self.token) {
            JobEntry::Existing(job) => {
                debug!(bundle = %info.name, job = job.id(), "Joining in-flight job");
                Some(job)
            }
            JobEntry::Created(job) => self.start(job),
        }
    }

    /// Spawn a freshly created job, unless a job that finished after the
    /// availability check already loaded the bundle.
    fn start(self: &Arc<Self>, job: Arc<JobInfo>) -> Option<Arc<JobInfo>> {
        if self.loaded.contains_key(job.name()) {
            self.jobs.remove(&job);
            // Release anyone who joined the job in the meantime.
            job.succeed();
            debug!(
                bundle = %job.name(),
                job = job.id(),
                "Bundle loaded meanwhile; job dropped"
            );
            return None;
        }

        debug!(bundle = %job.name(), job = job.id(), "Queued acquisition");
        self.runtime.spawn(Arc::clone(self).run_job(Arc::clone(&job)));
        Some(job)
    }

    async fn run_job(self: Arc<Self>, job: Arc<JobInfo>) {
        let cancellation = job.cancellation().clone();
        let outcome = tokio::select! {
            biased;
            _ = cancellation.cancelled() => None,
            result = self.acquire(&job) => Some(result),
        };

        // Load before leaving the table: callers always see the job or the bundle.
        match outcome {
            Some(Ok(bundle)) => {
                self.loaded.insert(job.name().to_string(), Arc::new(bundle));
                self.jobs.remove(&job);
                job.succeed();
                info!(
                    bundle = %job.name(),
                    job = job.id(),
                    elapsed_ms = job.elapsed().as_millis() as u64,
                    "Bundle acquired"
                );
            }
            Some(Err(e)) => {
                self.jobs.remove(&job);
                let reason = match e {
                    ProviderError::Fetch(inner) => inner.to_string(),
                    other => other.to_string(),
                };
                warn!(
                    bundle = %job.name(),
                    job = job.id(),
                    error = %reason,
                    "Bundle acquisition failed"
                );
                job.fail(reason);
            }
            None => {
                self.jobs.remove(&job);
                job.mark_cancelled();
                debug!(bundle = %job.name(), job = job.id(), "Bundle acquisition cancelled");
            }
        }
    }

    async fn acquire(&self, job: &JobInfo) -> ProviderResult<Bundle> {
        let _permit = self
            .transfers
            .acquire()
            .await
            .map_err(|_| ProviderError::Closed)?;
        job.set_running();

        let info = job.bundle();
        let bundle = self
            .source()
            .try_fetch_bundle(&info.name, &info.checksum, info.size)
            .await?;
        self.store.put(&info.name, bundle.raw()).await?;
        Ok(bundle)
    }

    async fn bundle(&self, name: &str) -> ProviderResult<Arc<Bundle>> {
        let info = self
            .manifest
            .get(name)
            .ok_or_else(|| ProviderError::BundleUnknown(name.to_string()))?;

        if let Some(bundle) = self.loaded.get(name) {
            return Ok(Arc::clone(bundle.value()));
        }

        let bundle = if self.store.is_valid_info(info) {
            let Some(raw) = self.store.read(name).await? else {
                return Err(ProviderError::BundleUnavailable(name.to_string()));
            };
            if self.verify_checksums {
                if let Err(e) = verify_payload(name, &raw, &info.checksum, info.size) {
                    warn!(bundle = %name, error = %e, "Stored bundle corrupt; dropping it");
                    self.store.remove(name).await?;
                    return Err(ProviderError::BundleUnavailable(name.to_string()));
                }
            }
            Bundle::parse(name, raw)?
        } else if self.embedded.is_valid_info(info) {
            self.local
                .try_fetch_bundle(name, &info.checksum, info.size)
                .await?
        } else {
            return Err(ProviderError::BundleUnavailable(name.to_string()));
        };

        debug!(bundle = %name, entries = bundle.len(), "Bundle loaded from local state");
        // Keep whichever copy a concurrent reader inserted first.
        let entry = self
            .loaded
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(bundle));
        Ok(Arc::clone(entry.value()))
    }

    async fn asset(&self, asset_path: &str) -> ProviderResult<AssetHandle> {
        let owner = self
            .manifest
            .find_asset(asset_path)
            .ok_or_else(|| ProviderError::AssetNotFound(asset_path.to_string()))?;
        let bundle = self.bundle(&owner.name).await?;
        let data = bundle
            .entry(asset_path)
            .cloned()
            .ok_or_else(|| ProviderError::AssetNotFound(asset_path.to_string()))?;

        Ok(AssetHandle::new(asset_path, owner.name.clone(), data))
    }

    async fn scene(&self, asset_path: &str, mode: SceneLoadMode) -> ProviderResult<SceneHandle> {
        let scene = SceneHandle::new(self.asset(asset_path).await?, mode);

        let mut scenes = self.scenes.lock();
        if mode == SceneLoadMode::Single {
            scenes.clear();
        }
        scenes.push(scene.clone());
        debug!(scene = %asset_path, mode = ?mode, active = scenes.len(), "Scene loaded");
        Ok(scene)
    }

    fn shutdown(&self) {
        self.token.cancel();
        let cancelled = self.jobs.cancel_all();
        self.transfers.close();
        self.loaded.clear();
        self.scenes.lock().clear();
        info!(cancelled_jobs = cancelled, "Provider closed");
    }
}

/// The default [`AssetProvider`].
///
/// # Session flow
///
/// ```text
/// open(config)
///   ├── LocalBundleStore::open(store_dir)
///   ├── EmbeddedManifest::load_or_empty(local root)
///   ├── authoritative manifest: remote → cached → embedded
///   └── completed.send(())
///
/// ensure_bundle(info)
///   ├── valid (embedded or store) or loaded → None
///   └── JobTable::get_or_create ── Created → spawn:
///         permit → fetch (remote, else local) → verify → store.put → loaded
/// ```
///
/// Without an injected client, each session builds a [`ReqwestClient`] with
/// the configured timeout.
pub struct BundleAcquisitionProvider {
    client: Option<Arc<dyn AsyncHttpClient>>,
    state: RwLock<ProviderState>,
    completed: broadcast::Sender<()>,
}

impl BundleAcquisitionProvider {
    /// Create a closed provider using the reqwest transport.
    pub fn new() -> Self {
        Self::from_client(None)
    }

    /// Create a closed provider with an injected transport.
    pub fn with_client(client: Arc<dyn AsyncHttpClient>) -> Self {
        Self::from_client(Some(client))
    }

    fn from_client(client: Option<Arc<dyn AsyncHttpClient>>) -> Self {
        let (completed, _) = broadcast::channel(COMPLETED_CHANNEL_CAPACITY);
        Self {
            client,
            state: RwLock::new(ProviderState::Closed),
            completed,
        }
    }

    fn session(&self) -> ProviderResult<Arc<Session>> {
        match &*self.state.read() {
            ProviderState::Open(session) => Ok(Arc::clone(session)),
            ProviderState::Closed => Err(ProviderError::Closed),
        }
    }

    /// The authoritative manifest of the current session.
    pub fn manifest(&self) -> ProviderResult<Arc<Manifest>> {
        Ok(Arc::clone(&self.session()?.manifest))
    }

    /// Where the current manifest came from.
    pub fn manifest_source(&self) -> ProviderResult<ManifestSource> {
        Ok(self.session()?.manifest_source)
    }

    /// The session's bundle store.
    pub fn store(&self) -> ProviderResult<Arc<LocalBundleStore>> {
        Ok(Arc::clone(&self.session()?.store))
    }

    /// Snapshot of in-flight jobs, oldest first.
    pub fn tasks(&self) -> ProviderResult<Vec<Arc<JobInfo>>> {
        Ok(self.session()?.jobs.jobs())
    }

    async fn open_session(&self, config: ProviderConfig) -> ProviderResult<()> {
        if config.local_root.trim().is_empty() {
            return Err(ProviderError::Config("local root is empty".to_string()));
        }
        self.close();

        let client = match &self.client {
            Some(client) => Arc::clone(client),
            None => Arc::new(
                ReqwestClient::with_timeout(config.timeout)
                    .map_err(|e| ProviderError::Config(e.to_string()))?,
            ),
        };

        let local = BundleFetcher::new(Arc::clone(&client), &config.local_root)
            .with_verify_checksums(config.verify_checksums);
        let remote = config.remote_root.as_deref().map(|root| {
            BundleFetcher::new(Arc::clone(&client), root)
                .with_verify_checksums(config.verify_checksums)
        });

        let store = Arc::new(LocalBundleStore::open(&config.store_dir).await?);
        let embedded = Arc::new(EmbeddedManifest::load_or_empty(&local).await);
        let (manifest, manifest_source) =
            resolve_manifest(&embedded, remote.as_ref(), &store).await;

        let validity = LocalValidity::new()
            .with_source(Arc::clone(&embedded) as Arc<dyn LocalValidityChecker>)
            .with_source(Arc::clone(&store) as Arc<dyn LocalValidityChecker>);

        info!(
            build = manifest.build(),
            tag = %manifest.tag(),
            bundles = manifest.len(),
            source = %manifest_source,
            local_root = %local.root(),
            remote_root = remote.as_ref().map(|r| r.root()).unwrap_or("-"),
            "Provider opened"
        );

        let session = Arc::new(Session {
            manifest: Arc::new(manifest),
            manifest_source,
            embedded,
            store,
            validity,
            local,
            remote,
            jobs: JobTable::new(),
            loaded: DashMap::new(),
            scenes: Mutex::new(Vec::new()),
            token: CancellationToken::new(),
            transfers: Semaphore::new(config.max_concurrent_downloads.max(1)),
            runtime: Handle::current(),
            verify_checksums: config.verify_checksums,
        });

        let previous = std::mem::replace(&mut *self.state.write(), ProviderState::Open(session));
        if let ProviderState::Open(previous) = previous {
            previous.shutdown();
        }

        // No subscribers is not an error.
        let _ = self.completed.send(());
        Ok(())
    }
}

impl std::fmt::Debug for BundleAcquisitionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleAcquisitionProvider")
            .field("injected_client", &self.client.is_some())
            .field("open", &self.is_open())
            .finish()
    }
}

impl Default for BundleAcquisitionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BundleAcquisitionProvider {
    fn drop(&mut self) {
        self.close();
    }
}

/// Pick the authoritative manifest: remote, then the cached remote copy,
/// then the embedded one.
async fn resolve_manifest(
    embedded: &EmbeddedManifest,
    remote: Option<&BundleFetcher>,
    store: &LocalBundleStore,
) -> (Manifest, ManifestSource) {
    let Some(remote) = remote else {
        return (embedded.manifest().clone(), ManifestSource::Embedded);
    };

    let fetched = match remote.try_fetch_stream(MANIFEST_FILE_NAME).await {
        Ok(bytes) => Manifest::from_slice(&bytes).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match fetched {
        Ok(manifest) => {
            if let Err(e) = store.save_manifest(&manifest).await {
                warn!(error = %e, "Failed to cache remote manifest");
            }
            return (manifest, ManifestSource::Remote);
        }
        Err(reason) => {
            warn!(root = %remote.root(), error = %reason, "Remote manifest unavailable");
        }
    }

    match store.load_manifest().await {
        Ok(Some(manifest)) => {
            info!(build = manifest.build(), "Using cached remote manifest");
            (manifest, ManifestSource::Cached)
        }
        Ok(None) => (embedded.manifest().clone(), ManifestSource::Embedded),
        Err(e) => {
            warn!(error = %e, "Cached manifest unusable; falling back to embedded manifest");
            (embedded.manifest().clone(), ManifestSource::Embedded)
        }
    }
}

impl AssetProvider for BundleAcquisitionProvider {
    fn open(&self, config: ProviderConfig) -> BoxFuture<'_, ProviderResult<()>> {
        Box::pin(self.open_session(config))
    }

    fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), ProviderState::Closed);
        if let ProviderState::Open(session) = previous {
            session.shutdown();
        }
    }

    fn is_open(&self) -> bool {
        matches!(&*self.state.read(), ProviderState::Open(_))
    }

    fn tag(&self) -> ProviderResult<String> {
        Ok(self.session()?.manifest.tag().to_string())
    }

    fn build(&self) -> ProviderResult<u32> {
        Ok(self.session()?.manifest.build())
    }

    fn get_invalidated_bundles(&self) -> ProviderResult<Vec<BundleInfo>> {
        let session = self.session()?;
        Ok(session
            .manifest
            .dependency_order()
            .into_iter()
            .filter(|info| !session.is_available(info))
            .cloned()
            .collect())
    }

    fn ensure_bundle(&self, info: &BundleInfo) -> ProviderResult<Option<Arc<JobInfo>>> {
        Ok(self.session()?.ensure(info))
    }

    fn ensure_bundles(
        &self,
        load: &BundleLoad,
        on_complete: CompletionCallback,
    ) -> ProviderResult<Vec<Arc<JobInfo>>> {
        let session = self.session()?;
        for name in load.names() {
            if !session.manifest.contains(name) {
                warn!(bundle = %name, "Load requests a bundle the manifest does not list");
            }
        }

        let jobs: Vec<Arc<JobInfo>> = session
            .manifest
            .resolve(load.names())
            .into_iter()
            .filter_map(|info| session.ensure(info))
            .collect();

        if jobs.is_empty() {
            on_complete();
        } else {
            let waiting = jobs.clone();
            session.runtime.spawn(async move {
                let statuses = wait_all(&waiting).await;
                debug!(jobs = statuses.len(), statuses = ?statuses, "Load finished");
                on_complete();
            });
        }
        Ok(jobs)
    }

    fn find(&self, asset_path: &str) -> ProviderResult<Option<String>> {
        Ok(self
            .session()?
            .manifest
            .find_asset(asset_path)
            .map(|info| info.name.clone()))
    }

    fn is_asset_available(&self, asset_path: &str) -> ProviderResult<bool> {
        let session = self.session()?;
        Ok(session
            .manifest
            .find_asset(asset_path)
            .is_some_and(|info| session.is_available(info)))
    }

    fn is_asset_exists(&self, asset_path: &str) -> ProviderResult<bool> {
        Ok(self.session()?.manifest.find_asset(asset_path).is_some())
    }

    fn is_bundle_available(&self, name: &str) -> ProviderResult<bool> {
        let session = self.session()?;
        Ok(session
            .manifest
            .get(name)
            .is_some_and(|info| session.is_available(info)))
    }

    fn for_each_task(&self, visit: &mut dyn FnMut(&Arc<JobInfo>)) -> ProviderResult<()> {
        for job in self.session()?.jobs.jobs() {
            visit(&job);
        }
        Ok(())
    }

    fn get_bundle<'a>(&'a self, name: &'a str) -> BoxFuture<'a, ProviderResult<Arc<Bundle>>> {
        Box::pin(async move { self.session()?.bundle(name).await })
    }

    fn get_asset<'a>(&'a self, asset_path: &'a str) -> BoxFuture<'a, ProviderResult<AssetHandle>> {
        Box::pin(async move { self.session()?.asset(asset_path).await })
    }

    fn get_file_system<'a>(
        &'a self,
        name: &'a str,
    ) -> BoxFuture<'a, ProviderResult<Arc<dyn FileSystem>>> {
        Box::pin(async move {
            let bundle = self.session()?.bundle(name).await?;
            Ok(bundle as Arc<dyn FileSystem>)
        })
    }

    fn load_scene<'a>(&'a self, asset_path: &'a str) -> BoxFuture<'a, ProviderResult<SceneHandle>> {
        Box::pin(async move {
            self.session()?
                .scene(asset_path, SceneLoadMode::Single)
                .await
        })
    }

    fn load_scene_additive<'a>(
        &'a self,
        asset_path: &'a str,
    ) -> BoxFuture<'a, ProviderResult<SceneHandle>> {
        Box::pin(async move {
            self.session()?
                .scene(asset_path, SceneLoadMode::Additive)
                .await
        })
    }

    fn active_scenes(&self) -> ProviderResult<Vec<SceneHandle>> {
        Ok(self.session()?.scenes.lock().clone())
    }

    fn subscribe_completed(&self) -> broadcast::Receiver<()> {
        self.completed.subscribe()
    }
}
