//! Join over a set of jobs.

use std::sync::Arc;

use futures::future::join_all;

use super::job::{JobInfo, JobStatus};

/// Wait until every job reaches a terminal status.
///
/// Returns the terminal statuses in the order the jobs were given. Finish
/// order does not matter, and a failed job does not short-circuit the wait.
pub async fn wait_all(jobs: &[Arc<JobInfo>]) -> Vec<JobStatus> {
    join_all(jobs.iter().map(|job| job.wait())).await
}
