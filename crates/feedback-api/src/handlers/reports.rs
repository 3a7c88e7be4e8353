//! Report routes, all JWT-authenticated reads.

use crate::auth::gateway::Identity;
use crate::errors::ApiError;
use crate::models::{ListReportsOptions, ReportItem, ReportListResult};
use crate::routes::AppState;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListReportsQuery {
    target_id: Option<String>,
    limit: Option<u32>,
    next_token: Option<String>,
}

/// `GET /reports?targetId=...`.
pub async fn list_reports(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ReportListResult>, ApiError> {
    let target_id = query.target_id.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| {
        ApiError::bad_request("targetId query parameter is required")
            .with_request_id(&identity.request_id)
    })?;

    let result = state
        .reports
        .list_reports(
            target_id,
            ListReportsOptions {
                limit: query.limit,
                next_token: query.next_token,
            },
        )
        .await
        .map_err(|e| e.with_request_id(&identity.request_id))?;

    Ok(Json(result))
}

/// `GET /reports/{targetId}/{reportId}`.
pub async fn get_report(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path((target_id, report_id)): Path<(String, String)>,
) -> Result<Json<ReportItem>, ApiError> {
    let report = state
        .reports
        .get_report(&target_id, &report_id)
        .await
        .map_err(|e| e.with_request_id(&identity.request_id))?;

    Ok(Json(report))
}
