use crate::models::PingResponse;
use axum::Json;
use chrono::Utc;

/// Public liveness probe.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        service: "feedback-api".to_string(),
    })
}
