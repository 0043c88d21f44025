//! Structured bundle container and content handles.
//!
//! A bundle file is a small self-describing container holding an ordered set
//! of `(asset path, bytes)` entries:
//!
//! ```text
//! ┌──────┬─────────┬──────────────────────────────────────┐
//! │ UBFS │ version │ gzip( bincode( [ (path, bytes) .. ] ))│
//! │ 4 B  │ 1 B     │                                      │
//! └──────┴─────────┴──────────────────────────────────────┘
//! ```
//!
//! [`Bundle::parse`] either yields a fully decoded bundle or an error; there
//! is no partially initialised state. [`BundleBuilder`] produces the same
//! format for packing and tests.

mod asset;
mod container;
mod error;
mod filesystem;

pub use asset::{AssetHandle, SceneHandle, SceneLoadMode};
pub use container::{Bundle, BundleBuilder, BUNDLE_FORMAT_VERSION, BUNDLE_MAGIC};
pub use error::{BundleError, BundleResult};
pub use filesystem::FileSystem;
