//! Asset provider: the acquisition façade.
//!
//! The provider turns a manifest into dependency-aware, deduplicated
//! acquisition of bundles, and serves assets, file systems and scenes out of
//! whatever is valid locally.
//!
//! # Architecture
//!
//! ```text
//!                    ┌──────────────────────────────┐
//!  ensure_bundles ──►│  BundleAcquisitionProvider   │──► completed (broadcast)
//!                    │                              │
//!                    │  Manifest (per session)      │
//!                    │  LocalValidity               │
//!                    │   ├── EmbeddedManifest       │
//!                    │   └── LocalBundleStore       │
//!                    │  JobTable (dedup by name)    │
//!                    └──────────────┬───────────────┘
//!                                   │ spawn per new job
//!                                   ▼
//!                     Semaphore ──► BundleFetcher ──► LocalBundleStore::put
//! ```
//!
//! Acquisition failures never surface as errors of the provider itself: a
//! failed or cancelled transfer is reported on its [`JobInfo`](crate::jobs::JobInfo)
//! and leaves the bundle invalid until the caller ensures it again.

mod acquisition;
mod error;
mod traits;

pub use acquisition::BundleAcquisitionProvider;
pub use error::{ProviderError, ProviderResult};
pub use traits::{AssetProvider, CompletionCallback, ManifestSource};
