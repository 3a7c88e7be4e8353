//! The query API trait and its HTTP implementation.

use crate::error::QueryError;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument, warn};

/// Default timeout for query service requests in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default query executed when the caller supplies none.
const DEFAULT_QUERY: &str =
    "fields @timestamp, @message | sort @timestamp desc | limit 100";

/// Identifier of a submitted query job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A query to run against a set of log groups over a time window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    /// Log groups to search.
    pub log_groups: Vec<String>,

    /// Query text in the remote service's query language.
    pub query: String,

    /// Window start (inclusive).
    pub start_time: DateTime<Utc>,

    /// Window end (inclusive).
    pub end_time: DateTime<Utc>,
}

impl QuerySpec {
    /// The default query over the last hour.
    pub fn last_hour(log_groups: Vec<String>) -> Self {
        let end_time = Utc::now();
        Self {
            log_groups,
            query: DEFAULT_QUERY.to_string(),
            start_time: end_time - Duration::hours(1),
            end_time,
        }
    }
}

/// Remote job status as reported by the query service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Running,
    Complete,
    Failed,
    Cancelled,
}

impl RemoteStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RemoteStatus::Running)
    }
}

/// One observation of a job: its status, and the result rows once complete.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub status: RemoteStatus,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

/// The submit-then-poll query protocol.
#[async_trait::async_trait]
pub trait LogQueryApi: Send + Sync {
    /// Submit a query for background execution.
    async fn submit(&self, spec: &QuerySpec) -> Result<JobId, QueryError>;

    /// Fetch the current status (and result, if complete) of a job.
    async fn get_status(&self, job_id: &JobId) -> Result<JobSnapshot, QueryError>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    job_id: JobId,
}

/// HTTP client for the remote query service.
#[derive(Clone)]
pub struct HttpLogQueryClient {
    /// HTTP client with configured timeouts.
    client: Client,

    /// Base URL of the query service.
    base_url: String,
}

impl HttpLogQueryClient {
    /// Create a new query client.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: String) -> Result<Self, QueryError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| {
                error!(target: "log_query.client", error = %e, "Failed to build HTTP client");
                QueryError::Transport(e.to_string())
            })?;

        Ok(Self { client, base_url })
    }
}

#[async_trait::async_trait]
impl LogQueryApi for HttpLogQueryClient {
    #[instrument(skip_all, fields(log_groups = spec.log_groups.len()))]
    async fn submit(&self, spec: &QuerySpec) -> Result<JobId, QueryError> {
        let url = format!("{}/queries", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(spec)
            .send()
            .await
            .map_err(|e| {
                warn!(target: "log_query.client", error = %e, "Query submission request failed");
                QueryError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                target: "log_query.client",
                status = %status,
                body = %body,
                "Query submission rejected"
            );
            return Err(QueryError::SubmissionFailed(format!(
                "service returned {}",
                status
            )));
        }

        let submitted: SubmitResponse = response.json().await.map_err(|e| {
            error!(target: "log_query.client", error = %e, "Failed to parse submission response");
            QueryError::InvalidResponse(e.to_string())
        })?;

        Ok(submitted.job_id)
    }

    #[instrument(skip(self), fields(job_id = %job_id))]
    async fn get_status(&self, job_id: &JobId) -> Result<JobSnapshot, QueryError> {
        let url = format!("{}/queries/{}", self.base_url, job_id);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!(target: "log_query.client", error = %e, "Status request failed");
            QueryError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(target: "log_query.client", status = %status, "Status request rejected");
            return Err(QueryError::InvalidResponse(format!(
                "service returned {}",
                status
            )));
        }

        response.json().await.map_err(|e| {
            error!(target: "log_query.client", error = %e, "Failed to parse status response");
            QueryError::InvalidResponse(e.to_string())
        })
    }
}
