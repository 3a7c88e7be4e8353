//! Evolution report service.

use crate::config::DEFAULT_PAGE_LIMIT;
use crate::errors::ApiError;
use crate::models::{
    CreateReportInput, ListReportsOptions, ReportItem, ReportListResult, ReportStatus,
};
use crate::services::{from_attributes, sort_key, to_attributes};
use crate::store::{Cursor, PartitionedStore, QueryOptions};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct ReportService {
    store: Arc<dyn PartitionedStore>,
}

/// Fields settable alongside a status transition.
#[derive(Debug, Default)]
pub struct StatusUpdate {
    pub analysis: Option<Value>,
    pub actions: Option<Value>,
    pub collected_data: Option<Value>,
}

impl ReportService {
    pub fn new(store: Arc<dyn PartitionedStore>) -> Self {
        Self { store }
    }

    /// Persist a new report, defaulting its status to `pending`.
    #[instrument(skip_all, fields(target_id = %target_id))]
    pub async fn create_report(
        &self,
        target_id: &str,
        input: CreateReportInput,
    ) -> Result<ReportItem, ApiError> {
        let created_at = Utc::now();
        let item = ReportItem {
            target_id: target_id.to_string(),
            report_id: sort_key("RPT", created_at),
            trigger_type: input.trigger_type,
            collected_data: input.collected_data,
            analysis: input.analysis,
            actions: input.actions,
            status: input.status.unwrap_or(ReportStatus::Pending),
            duration_ms: None,
            created_at,
            completed_at: None,
        };

        self.store
            .put(target_id, &item.report_id, to_attributes(&item)?)
            .await?;

        info!(
            target: "api.reports",
            target_id = %target_id,
            report_id = %item.report_id,
            status = %item.status.as_str(),
            "report stored"
        );

        Ok(item)
    }

    /// List reports for a target, most recent first.
    #[instrument(skip_all, fields(target_id = %target_id))]
    pub async fn list_reports(
        &self,
        target_id: &str,
        options: ListReportsOptions,
    ) -> Result<ReportListResult, ApiError> {
        let cursor = options
            .next_token
            .as_deref()
            .map(Cursor::decode)
            .transpose()
            .map_err(|_| ApiError::bad_request("Invalid nextToken"))?;

        let page = self
            .store
            .query_page(
                target_id,
                QueryOptions {
                    // A zero-row scan has no tail to derive a cursor from,
                    // so pagination could never advance. Treat 0 as 1.
                    limit: options.limit.unwrap_or(DEFAULT_PAGE_LIMIT).max(1),
                    cursor,
                    scan_descending: true,
                    filter: None,
                },
            )
            .await?;

        let next_token = page.next_cursor.as_ref().map(Cursor::encode);
        let items = page
            .items
            .into_iter()
            .map(|item| from_attributes(item.attributes))
            .collect::<Result<Vec<ReportItem>, _>>()?;

        Ok(ReportListResult {
            items,
            next_token,
            has_more: page.has_more,
        })
    }

    /// Fetch a single report.
    #[instrument(skip_all, fields(target_id = %target_id, report_id = %report_id))]
    pub async fn get_report(
        &self,
        target_id: &str,
        report_id: &str,
    ) -> Result<ReportItem, ApiError> {
        let item = self
            .store
            .get(target_id, report_id)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!(
                    "Report {} not found for target {}",
                    report_id, target_id
                ))
            })?;

        from_attributes(item.attributes)
    }

    /// Advance a report through its lifecycle.
    ///
    /// Transitions must move strictly forward and a terminal report is
    /// immutable; an illegal transition is a conflict. Reaching a terminal
    /// status stamps `completedAt` and the run duration.
    #[instrument(skip_all, fields(target_id = %target_id, report_id = %report_id, status = %status.as_str()))]
    pub async fn update_report_status(
        &self,
        target_id: &str,
        report_id: &str,
        status: ReportStatus,
        update: StatusUpdate,
    ) -> Result<ReportItem, ApiError> {
        let current = self.get_report(target_id, report_id).await?;

        if !current.status.can_transition_to(status) {
            return Err(ApiError::conflict(format!(
                "Cannot transition report from {} to {}",
                current.status.as_str(),
                status.as_str()
            )));
        }

        let mut deltas = crate::store::Attributes::new();
        deltas.insert("status".to_string(), json!(status));
        if let Some(analysis) = update.analysis {
            deltas.insert("analysis".to_string(), analysis);
        }
        if let Some(actions) = update.actions {
            deltas.insert("actions".to_string(), actions);
        }
        if let Some(collected_data) = update.collected_data {
            deltas.insert("collectedData".to_string(), collected_data);
        }
        if status.is_terminal() {
            let completed_at = Utc::now();
            let duration_ms = completed_at
                .signed_duration_since(current.created_at)
                .num_milliseconds()
                .max(0);
            deltas.insert("completedAt".to_string(), json!(completed_at));
            deltas.insert("durationMs".to_string(), json!(duration_ms));
        }

        self.store.update(target_id, report_id, deltas).await?;

        info!(
            target: "api.reports",
            target_id = %target_id,
            report_id = %report_id,
            from = %current.status.as_str(),
            to = %status.as_str(),
            "report status updated"
        );

        self.get_report(target_id, report_id).await
    }
}
