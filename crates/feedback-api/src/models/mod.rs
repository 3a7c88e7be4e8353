//! Data models for the feedback API.
//!
//! Wire names are camelCase (`targetId`, `feedbackId`, `nextToken`, ...) to
//! match the public API contract. Optional fields are omitted entirely when
//! unset rather than serialized as null, keeping the stored item shape
//! minimal and schema-evolution-friendly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored feedback item.
///
/// Partition key `targetId`, sort key `feedbackId`. The sort key embeds an
/// RFC3339 millisecond timestamp so lexicographic order equals creation
/// order within a partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub target_id: String,
    pub feedback_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(rename = "type")]
    pub feedback_type: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolution_report_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a feedback item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFeedbackInput {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(rename = "type", default)]
    pub feedback_type: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Options for listing feedback.
#[derive(Debug, Clone, Default)]
pub struct ListFeedbackOptions {
    pub processed: Option<bool>,
    pub limit: Option<u32>,
    pub next_token: Option<String>,
}

/// One page of feedback items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackListResult {
    pub items: Vec<FeedbackItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    pub has_more: bool,
}

/// Report lifecycle status.
///
/// Transitions are strictly forward: `pending` -> `in_progress` ->
/// `completed` | `failed`. A report is immutable once terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ReportStatus {
    /// Whether no further transition is permitted from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, ReportStatus::Completed | ReportStatus::Failed)
    }

    /// Validate a status transition.
    ///
    /// A transition is legal iff the current status is non-terminal and the
    /// new status is strictly further along the lifecycle. Skipping
    /// `in_progress` is allowed (a run may fail before starting work);
    /// repeating or reversing a status is not.
    pub fn can_transition_to(self, next: ReportStatus) -> bool {
        !self.is_terminal() && next.rank() > self.rank()
    }

    fn rank(self) -> u8 {
        match self {
            ReportStatus::Pending => 0,
            ReportStatus::InProgress => 1,
            ReportStatus::Completed | ReportStatus::Failed => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::InProgress => "in_progress",
            ReportStatus::Completed => "completed",
            ReportStatus::Failed => "failed",
        }
    }
}

/// What initiated an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Scheduled,
    Manual,
    Threshold,
}

/// A stored evolution report.
///
/// Partition key `targetId`, sort key `reportId`, same ordering invariant
/// as feedback items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportItem {
    pub target_id: String,
    pub report_id: String,
    pub trigger_type: TriggerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collected_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
    pub status: ReportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for creating a report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportInput {
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub collected_data: Option<Value>,
    #[serde(default)]
    pub analysis: Option<Value>,
    #[serde(default)]
    pub actions: Option<Value>,
    #[serde(default)]
    pub status: Option<ReportStatus>,
}

/// Options for listing reports.
#[derive(Debug, Clone, Default)]
pub struct ListReportsOptions {
    pub limit: Option<u32>,
    pub next_token: Option<String>,
}

/// One page of reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportListResult {
    pub items: Vec<ReportItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
    pub has_more: bool,
}

/// Response for the public `/ping` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
}
