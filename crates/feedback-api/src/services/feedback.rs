//! Feedback item service.

use crate::config::DEFAULT_PAGE_LIMIT;
use crate::errors::ApiError;
use crate::models::{CreateFeedbackInput, FeedbackItem, FeedbackListResult, ListFeedbackOptions};
use crate::services::{from_attributes, sort_key, to_attributes};
use crate::store::{Cursor, PartitionedStore, QueryOptions};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};

/// Batch size for the unprocessed-feedback pull used by the analysis
/// pipeline.
const UNPROCESSED_BATCH_LIMIT: u32 = 100;

#[derive(Clone)]
pub struct FeedbackService {
    store: Arc<dyn PartitionedStore>,
}

impl FeedbackService {
    pub fn new(store: Arc<dyn PartitionedStore>) -> Self {
        Self { store }
    }

    /// Validate and persist a new feedback item.
    #[instrument(skip_all, fields(target_id = %target_id))]
    pub async fn create_feedback(
        &self,
        target_id: &str,
        input: CreateFeedbackInput,
    ) -> Result<FeedbackItem, ApiError> {
        let feedback_type = input
            .feedback_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("type and message are required"))?
            .to_string();
        let message = input
            .message
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApiError::bad_request("type and message are required"))?
            .to_string();

        let created_at = Utc::now();
        let item = FeedbackItem {
            target_id: target_id.to_string(),
            feedback_id: sort_key("FB", created_at),
            user_id: input.user_id,
            feedback_type,
            message,
            rating: input.rating,
            metadata: input.metadata,
            processed: false,
            processed_at: None,
            evolution_report_id: None,
            created_at,
        };

        self.store
            .put(target_id, &item.feedback_id, to_attributes(&item)?)
            .await?;

        info!(
            target: "api.feedback",
            target_id = %target_id,
            feedback_id = %item.feedback_id,
            feedback_type = %item.feedback_type,
            "feedback stored"
        );

        Ok(item)
    }

    /// List feedback for a target, most recent first, with opaque-cursor
    /// pagination and an optional processed-state filter.
    ///
    /// The filter applies after the scan limit, so a filtered page can be
    /// short even when `has_more` is true; callers follow `next_token` until
    /// `has_more` is false.
    #[instrument(skip_all, fields(target_id = %target_id))]
    pub async fn list_feedback(
        &self,
        target_id: &str,
        options: ListFeedbackOptions,
    ) -> Result<FeedbackListResult, ApiError> {
        let cursor = options
            .next_token
            .as_deref()
            .map(Cursor::decode)
            .transpose()
            .map_err(|_| ApiError::bad_request("Invalid nextToken"))?;

        let filter = options.processed.map(|want| {
            Box::new(move |attributes: &crate::store::Attributes| {
                attributes
                    .get("processed")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
                    == want
            }) as crate::store::FilterPredicate
        });

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
                    filter,
                },
            )
            .await?;

        let next_token = page.next_cursor.as_ref().map(Cursor::encode);
        let items = page
            .items
            .into_iter()
            .map(|item| from_attributes(item.attributes))
            .collect::<Result<Vec<FeedbackItem>, _>>()?;

        Ok(FeedbackListResult {
            items,
            next_token,
            has_more: page.has_more,
        })
    }

    /// Pull a batch of unprocessed feedback for analysis, via the
    /// processed-flag index rather than a filtered scan.
    #[instrument(skip_all, fields(target_id = %target_id))]
    pub async fn list_unprocessed_feedback(
        &self,
        target_id: &str,
    ) -> Result<Vec<FeedbackItem>, ApiError> {
        let items = self
            .store
            .query_flag_index(target_id, "processed", false, UNPROCESSED_BATCH_LIMIT)
            .await?;

        items
            .into_iter()
            .map(|item| from_attributes(item.attributes))
            .collect()
    }

    /// Mark a feedback item processed, recording when and by which report.
    ///
    /// Idempotent: re-marking an already-processed item refreshes the
    /// timestamp and report link without error.
    #[instrument(skip_all, fields(target_id = %target_id, feedback_id = %feedback_id))]
    pub async fn mark_as_processed(
        &self,
        target_id: &str,
        feedback_id: &str,
        evolution_report_id: &str,
    ) -> Result<(), ApiError> {
        if self.store.get(target_id, feedback_id).await?.is_none() {
            return Err(ApiError::not_found(format!(
                "Feedback {} not found for target {}",
                feedback_id, target_id
            )));
        }

        let mut deltas = crate::store::Attributes::new();
        deltas.insert("processed".to_string(), json!(true));
        deltas.insert("processedAt".to_string(), json!(Utc::now()));
        deltas.insert(
            "evolutionReportId".to_string(),
            json!(evolution_report_id),
        );

        self.store.update(target_id, feedback_id, deltas).await?;

        info!(
            target: "api.feedback",
            target_id = %target_id,
            feedback_id = %feedback_id,
            evolution_report_id = %evolution_report_id,
            "feedback marked processed"
        );

        Ok(())
    }
}
