//! Feedback routes: API-key-authenticated submission, JWT-authenticated
//! listing.

use crate::auth::gateway::Identity;
use crate::errors::ApiError;
use crate::models::{CreateFeedbackInput, FeedbackListResult, ListFeedbackOptions};
use crate::routes::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

/// `POST /feedback`.
///
/// The tenant scope comes from the identity resolved by the API-key layer,
/// never from the body.
pub async fn create_feedback(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(input): Json<CreateFeedbackInput>,
) -> Result<impl IntoResponse, ApiError> {
    let target_id = identity
        .target_id
        .as_deref()
        .ok_or_else(ApiError::internal)?;

    let item = state
        .feedback
        .create_feedback(target_id, input)
        .await
        .map_err(|e| e.with_request_id(&identity.request_id))?;

    Ok((StatusCode::CREATED, Json(item)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFeedbackQuery {
    target_id: Option<String>,
    processed: Option<bool>,
    limit: Option<u32>,
    next_token: Option<String>,
}

/// `GET /feedback?targetId=...`.
///
/// JWT callers are not bound to one tenant, so the scope is an explicit,
/// required query parameter.
pub async fn list_feedback(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<ListFeedbackQuery>,
) -> Result<Json<FeedbackListResult>, ApiError> {
    let target_id = query.target_id.as_deref().filter(|s| !s.is_empty()).ok_or_else(|| {
        ApiError::bad_request("targetId query parameter is required")
            .with_request_id(&identity.request_id)
    })?;

    let result = state
        .feedback
        .list_feedback(
            target_id,
            ListFeedbackOptions {
                processed: query.processed,
                limit: query.limit,
                next_token: query.next_token,
            },
        )
        .await
        .map_err(|e| e.with_request_id(&identity.request_id))?;

    Ok(Json(result))
}
