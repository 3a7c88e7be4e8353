//! The polling loop that drives a submitted query job to completion.

use crate::client::{JobId, LogQueryApi, QuerySpec, RemoteStatus};
use crate::error::QueryError;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Default interval between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default number of polls before giving up on a running job.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy)]
pub struct PollOptions {
    pub poll_interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// How a polled job ended.
///
/// Exhausting the poll budget is an outcome, not an error: the job may still
/// complete remotely, and the caller keeps the id to check again later.
#[derive(Debug)]
pub enum QueryOutcome {
    /// The job finished and produced a result.
    Complete {
        job_id: JobId,
        result: Option<Value>,
    },
    /// The remote service reported the job failed.
    Failed { job_id: JobId },
    /// The job was cancelled remotely.
    Cancelled { job_id: JobId },
    /// The job was still running after the last allowed poll.
    TimedOut { job_id: JobId },
}

/// Drives submitted jobs to a terminal status by polling.
pub struct QueryPoller {
    api: Arc<dyn LogQueryApi>,
}

impl QueryPoller {
    pub fn new(api: Arc<dyn LogQueryApi>) -> Self {
        Self { api }
    }

    /// Submit a query and wait for it to finish.
    pub async fn run(
        &self,
        spec: &QuerySpec,
        options: PollOptions,
    ) -> Result<QueryOutcome, QueryError> {
        let job_id = self.api.submit(spec).await?;
        info!(target: "log_query.poller", job_id = %job_id, "Query submitted");
        self.await_completion(job_id, options).await
    }

    /// Poll a job until it reaches a terminal status or the attempt budget
    /// runs out. Each attempt sleeps first, matching the remote service's
    /// minimum scheduling latency: a job is never complete immediately after
    /// submission.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn await_completion(
        &self,
        job_id: JobId,
        options: PollOptions,
    ) -> Result<QueryOutcome, QueryError> {
        for attempt in 1..=options.max_attempts {
            tokio::time::sleep(options.poll_interval).await;

            let snapshot = self.api.get_status(&job_id).await?;
            debug!(
                target: "log_query.poller",
                attempt,
                status = ?snapshot.status,
                "Polled job status"
            );

            match snapshot.status {
                RemoteStatus::Running => continue,
                RemoteStatus::Complete => {
                    info!(target: "log_query.poller", attempt, "Query complete");
                    return Ok(QueryOutcome::Complete {
                        job_id,
                        result: snapshot.result,
                    });
                }
                RemoteStatus::Failed => {
                    warn!(target: "log_query.poller", attempt, "Query failed remotely");
                    return Ok(QueryOutcome::Failed { job_id });
                }
                RemoteStatus::Cancelled => {
                    warn!(target: "log_query.poller", attempt, "Query cancelled remotely");
                    return Ok(QueryOutcome::Cancelled { job_id });
                }
            }
        }

        warn!(
            target: "log_query.poller",
            max_attempts = options.max_attempts,
            "Poll budget exhausted with job still running"
        );
        Ok(QueryOutcome::TimedOut { job_id })
    }
}
