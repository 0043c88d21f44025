//! Non-blocking bundle fetching.
//!
//! This module provides the transport seam and the dual-mode fetcher:
//! - Transport abstraction with a reqwest/`file://` implementation (`http`)
//! - SHA-256 payload verification (`checksum`)
//! - Raw stream and parsed bundle fetches (`fetcher`)
//!
//! # Architecture
//!
//! ```text
//! BundleFetcher ── uri = <root>/<name>
//!         │
//!         ├── fetch_stream  → Bytes
//!         ├── fetch_bundle  → verify size + checksum → Bundle::parse
//!         │
//!         └── AsyncHttpClient (trait)
//!                 └── ReqwestClient (http(s):// via reqwest, file:// via tokio::fs)
//! ```
//!
//! Fetches suspend only while the transport is in flight. The `fetch_*`
//! operations never raise across the async boundary: failures are logged and
//! surface as `None`. The `try_fetch_*` variants return the typed
//! [`FetchError`] for callers that record failure reasons.

mod checksum;
mod error;
mod fetcher;
mod http;

pub use checksum::{sha256_hex, verify_payload};
pub use error::{FetchError, FetchResult};
pub use fetcher::BundleFetcher;
pub use http::{AsyncHttpClient, BoxFuture, HttpResponse, ReqwestClient};

#[cfg(test)]
pub use http::tests::MockHttpClient;
