//! Local persistence of acquired bundles.
//!
//! Bundles fetched from the remote root are kept on disk keyed by name so
//! later sessions can treat them as valid without another transfer. The
//! store is one of the two sources consulted by the provider's validity
//! check, next to the embedded manifest.

mod error;
mod local;

pub use error::{StoreError, StoreResult};
pub use local::{LocalBundleStore, StoredBundle};
