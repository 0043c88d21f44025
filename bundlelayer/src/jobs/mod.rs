//! Acquisition jobs.
//!
//! One job fetches one bundle. Jobs are deduplicated by bundle name through
//! the [`JobTable`], report progress through a watch channel on
//! [`JobInfo`], and are joined with [`wait_all`].
//!
//! # Architecture
//!
//! ```text
//! ensure_bundle(info)
//!        │
//!        ▼
//! JobTable::get_or_create ──► Existing(job) ──► caller shares the handle
//!        │
//!        └──► Created(job) ──► spawned task: Queued → Running → terminal
//!                                               │
//!                      wait_all(&[job, ...]) ◄──┘ (barrier)
//! ```
//!
//! Each job's cancellation token is a child of the provider session token,
//! so closing the provider cancels every outstanding transfer.

mod barrier;
mod job;
mod table;

pub use barrier::wait_all;
pub use job::{JobInfo, JobStatus};
pub use table::{JobEntry, JobTable};
