//! BundleLayer - manifest-driven content bundle delivery
//!
//! This library decides, for the bundles declared in a trusted manifest, which
//! are already valid locally and which must be fetched, acquires the missing
//! ones with deduplicated asynchronous jobs, and serves their content through a
//! single provider interface regardless of where the bytes came from.
//!
//! # Architecture
//!
//! ```text
//! BundleAcquisitionProvider (provider)
//!         │
//!         ├── Manifest / EmbeddedManifest (manifest)
//!         │       └── LocalValidityChecker (trait)
//!         │
//!         ├── LocalBundleStore (store) ── also a LocalValidityChecker
//!         │
//!         ├── JobTable ── JobInfo ── wait_all (jobs)
//!         │
//!         └── BundleFetcher (fetch)
//!                 ├── AsyncHttpClient (trait) ── ReqwestClient
//!                 └── Bundle (bundle)
//! ```

pub mod bundle;
pub mod config;
pub mod fetch;
pub mod jobs;
pub mod manifest;
pub mod provider;
pub mod store;

pub use config::ProviderConfig;
pub use provider::{
    AssetProvider, BundleAcquisitionProvider, ManifestSource, ProviderError, ProviderResult,
};
