//! Deduplication table of in-flight jobs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use super::job::JobInfo;
use crate::manifest::BundleInfo;

/// Outcome of [`JobTable::get_or_create`].
#[derive(Debug, Clone)]
pub enum JobEntry {
    /// No job existed; the caller must start this one.
    Created(Arc<JobInfo>),
    /// A job for the bundle is already in flight.
    Existing(Arc<JobInfo>),
}

impl JobEntry {
    /// The job, whichever way it was obtained.
    pub fn job(&self) -> &Arc<JobInfo> {
        match self {
            Self::Created(job) | Self::Existing(job) => job,
        }
    }

    /// Consume into the job.
    pub fn into_job(self) -> Arc<JobInfo> {
        match self {
            Self::Created(job) | Self::Existing(job) => job,
        }
    }

    /// Whether this call created the job.
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }
}

/// Bundle name → in-flight job.
///
/// At most one job per name is held at any time. `get_or_create` holds the
/// shard lock for the name while deciding, so two racing callers for the
/// same bundle always end up with the same job.
#[derive(Debug, Default)]
pub struct JobTable {
    jobs: DashMap<String, Arc<JobInfo>>,
    next_id: AtomicU64,
}

impl JobTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the job for `bundle`, creating a queued one if none exists.
    pub fn get_or_create(&self, bundle: &BundleInfo, parent: &CancellationToken) -> JobEntry {
        match self.jobs.entry(bundle.name.clone()) {
            Entry::Occupied(entry) => JobEntry::Existing(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
                let job = Arc::new(JobInfo::new(id, bundle.clone(), parent));
                entry.insert(Arc::clone(&job));
                JobEntry::Created(job)
            }
        }
    }

    /// The in-flight job for `name`.
    pub fn get(&self, name: &str) -> Option<Arc<JobInfo>> {
        self.jobs.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove `job` if the table still holds that exact job.
    pub fn remove(&self, job: &Arc<JobInfo>) -> bool {
        self.jobs
            .remove_if(job.name(), |_, held| Arc::ptr_eq(held, job))
            .is_some()
    }

    /// Snapshot of all in-flight jobs, ordered by id.
    pub fn jobs(&self) -> Vec<Arc<JobInfo>> {
        let mut jobs: Vec<Arc<JobInfo>> = self
            .jobs
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        jobs.sort_by_key(|job| job.id());
        jobs
    }

    /// Cancel every job and empty the table. Returns the number cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut cancelled = 0;
        self.jobs.retain(|_, job| {
            job.cancel();
            cancelled += 1;
            false
        });
        cancelled
    }

    /// Number of in-flight jobs.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no job is in flight.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
