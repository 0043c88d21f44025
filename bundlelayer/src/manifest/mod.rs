//! Manifest types and local validity checks.
//!
//! A [`Manifest`] is one coherent, versioned view of which bundles should
//! exist: their names, checksums, sizes, dependency links and the asset paths
//! they own. It is parsed once per provider session and never mutated; a newer
//! manifest replaces an older one wholesale.
//!
//! # Type Overview
//!
//! ```text
//! Manifest                       EmbeddedManifest (composition)
//! ├── build: u32                 └── manifest: Manifest ←── shipped locally
//! ├── tag: String
//! └── bundles: [BundleInfo]      LocalValidityChecker (trait)
//!       ├── name                 ├── EmbeddedManifest
//!       ├── checksum             ├── LocalBundleStore (crate::store)
//!       ├── size                 └── LocalValidity (any-of composite)
//!       ├── dependencies
//!       └── assets
//! ```
//!
//! # File Format
//!
//! Both the local and the remote manifest are JSON documents stored as
//! [`MANIFEST_FILE_NAME`] under their root. Unknown fields are ignored.

mod embedded;
mod error;
mod types;
mod validity;

pub use embedded::{EmbeddedManifest, MANIFEST_FILE_NAME};
pub use error::{ManifestError, ManifestResult};
pub use types::{BundleInfo, BundleLoad, Manifest};
pub use validity::{LocalValidity, LocalValidityChecker};
