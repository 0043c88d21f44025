//! Job handle for one bundle acquisition.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::manifest::BundleInfo;

/// Lifecycle of an acquisition job.
///
/// ```text
/// Queued ──► Running ──► Succeeded
///    │          │
///    │          ├──────► Failed
///    └──────────┴──────► Cancelled
/// ```
///
/// Terminal states are sticky: once reached, later transitions are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Waiting for a transfer slot.
    Queued,
    /// Transfer in flight.
    Running,
    /// Bundle fetched, verified, stored and loaded.
    Succeeded,
    /// Transfer or verification failed.
    Failed,
    /// Cancelled before completion.
    Cancelled,
}

impl JobStatus {
    /// Whether the job has finished.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Handle to one in-flight acquisition.
///
/// Shared as `Arc<JobInfo>` between the job table, the task doing the work
/// and every caller that asked for the bundle. All of them observe the same
/// status.
pub struct JobInfo {
    id: u64,
    bundle: BundleInfo,
    status: watch::Sender<JobStatus>,
    cancellation: CancellationToken,
    error: Mutex<Option<String>>,
    created_at: Instant,
}

impl JobInfo {
    /// Create a queued job whose cancellation is tied to `parent`.
    pub fn new(id: u64, bundle: BundleInfo, parent: &CancellationToken) -> Self {
        let (status, _) = watch::channel(JobStatus::Queued);
        Self {
            id,
            bundle,
            status,
            cancellation: parent.child_token(),
            error: Mutex::new(None),
            created_at: Instant::now(),
        }
    }

    /// Unique job id within a provider.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Name of the bundle being acquired.
    pub fn name(&self) -> &str {
        &self.bundle.name
    }

    /// Manifest entry being acquired.
    pub fn bundle(&self) -> &BundleInfo {
        &self.bundle
    }

    /// Current status.
    pub fn status(&self) -> JobStatus {
        *self.status.borrow()
    }

    /// Whether the job has finished.
    pub fn is_finished(&self) -> bool {
        self.status().is_terminal()
    }

    /// Failure reason, set when the job failed.
    pub fn error(&self) -> Option<String> {
        self.error.lock().clone()
    }

    /// Time since the job was created.
    pub fn elapsed(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Cancel the job.
    ///
    /// A job that already finished keeps its terminal status.
    pub fn cancel(&self) {
        self.cancellation.cancel();
        self.transition(JobStatus::Cancelled);
    }

    /// Token the acquisition task selects against.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Wait until the job reaches a terminal status.
    pub async fn wait(&self) -> JobStatus {
        let mut rx = self.status.subscribe();
        // The sender lives in self, so the channel cannot close while borrowed.
        let status = match rx.wait_for(|status| status.is_terminal()).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        };
        status
    }

    pub(crate) fn set_running(&self) -> bool {
        self.transition(JobStatus::Running)
    }

    pub(crate) fn succeed(&self) -> bool {
        self.transition(JobStatus::Succeeded)
    }

    pub(crate) fn fail(&self, reason: impl Into<String>) -> bool {
        if self.is_finished() {
            return false;
        }
        *self.error.lock() = Some(reason.into());
        self.transition(JobStatus::Failed)
    }

    pub(crate) fn mark_cancelled(&self) -> bool {
        self.transition(JobStatus::Cancelled)
    }

    /// Apply a transition unless the job already finished.
    fn transition(&self, next: JobStatus) -> bool {
        self.status.send_if_modified(|current| {
            if current.is_terminal() || *current == next {
                return false;
            }
            *current = next;
            true
        })
    }
}

impl fmt::Debug for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobInfo")
            .field("id", &self.id)
            .field("bundle", &self.bundle.name)
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn job() -> JobInfo {
        JobInfo::new(1, BundleInfo::new("gfx01", "abc", 1000), &CancellationToken::new())
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = job();
        assert_eq!(job.id(), 1);
        assert_eq!(job.name(), "gfx01");
        assert_eq!(job.status(), JobStatus::Queued);
        assert!(!job.is_finished());
        assert!(job.error().is_none());
    }

    #[test]
    fn test_lifecycle_to_success() {
        let job = job();
        assert!(job.set_running());
        assert_eq!(job.status(), JobStatus::Running);
        assert!(job.succeed());
        assert_eq!(job.status(), JobStatus::Succeeded);
    }

    #[test]
    fn test_terminal_status_is_sticky() {
        let job = job();
        job.succeed();

        assert!(!job.fail("late"));
        job.cancel();
        assert_eq!(job.status(), JobStatus::Succeeded);
        assert!(job.error().is_none());
    }

    #[test]
    fn test_fail_records_reason() {
        let job = job();
        job.set_running();
        assert!(job.fail("status 500"));

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error().as_deref(), Some("status 500"));
    }

    #[test]
    fn test_cancel_fires_token() {
        let job = job();
        job.cancel();

        assert_eq!(job.status(), JobStatus::Cancelled);
        assert!(job.cancellation().is_cancelled());
    }

    #[test]
    fn test_parent_cancellation_reaches_job_token() {
        let parent = CancellationToken::new();
        let job = JobInfo::new(2, BundleInfo::new("gfx02", "abc", 1), &parent);

        parent.cancel();
        assert!(job.cancellation().is_cancelled());
        // Status moves only when the job itself is told.
        assert_eq!(job.status(), JobStatus::Queued);
    }

    #[tokio::test]
    async fn test_wait_resolves_on_terminal_status() {
        let job = Arc::new(job());
        let waiter = {
            let job = Arc::clone(&job);
            tokio::spawn(async move { job.wait().await })
        };

        job.set_running();
        job.fail("boom");

        assert_eq!(waiter.await.unwrap(), JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_wait_on_finished_job_returns_immediately() {
        let job = job();
        job.mark_cancelled();
        assert_eq!(job.wait().await, JobStatus::Cancelled);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(JobStatus::Succeeded.to_string(), "succeeded");
        assert_eq!(JobStatus::Cancelled.to_string(), "cancelled");
    }
}
