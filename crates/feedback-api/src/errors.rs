//! Service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and share
//! the wire shape `{error, message, code, timestamp, requestId}`. Messages
//! returned to clients for server faults are intentionally generic; the
//! actual cause is logged server-side.

use crate::auth::gateway::AuthError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

/// The error taxonomy for the feedback API.
///
/// - `Authentication`: resolved entirely by the auth gateway; 401, or 500
///   for verifier infrastructure faults
/// - `BadRequest`: missing/malformed headers, body fields, or cursors (400)
/// - `NotFound`: lookup of a nonexistent item (404)
/// - `Conflict`: illegal report status transition (409)
/// - `Database` / `Upstream`: store or remote-service call failed; surfaced
///   as-is, never retried (500 / 502)
#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("{0}")]
    Authentication(AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    Internal,
}

/// Service error carrying an optional correlation id.
///
/// Auth failures always carry the request id generated by the gateway;
/// handlers tag business errors with the authenticated request's id so
/// failures can be traced end-to-end.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct ApiError {
    pub kind: ErrorKind,
    pub request_id: Option<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ErrorKind::BadRequest(message.into()).into()
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ErrorKind::NotFound(message.into()).into()
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ErrorKind::Conflict(message.into()).into()
    }

    pub fn database(message: impl Into<String>) -> Self {
        ErrorKind::Database(message.into()).into()
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        ErrorKind::Upstream(message.into()).into()
    }

    pub fn internal() -> Self {
        ErrorKind::Internal.into()
    }

    /// Attach the request correlation id, keeping an already-present one.
    #[must_use]
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        if self.request_id.is_none() {
            self.request_id = Some(request_id.to_string());
        }
        self
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match &self.kind {
            ErrorKind::Authentication(auth) => {
                if auth.kind.is_infrastructure() {
                    StatusCode::INTERNAL_SERVER_ERROR
                } else {
                    StatusCode::UNAUTHORIZED
                }
            }
            ErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound(_) => StatusCode::NOT_FOUND,
            ErrorKind::Conflict(_) => StatusCode::CONFLICT,
            ErrorKind::Database(_) | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ErrorKind> for ApiError {
    fn from(kind: ErrorKind) -> Self {
        ApiError {
            kind,
            request_id: None,
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError {
            request_id: Some(err.request_id.clone()),
            kind: ErrorKind::Authentication(err),
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::database(err.to_string())
    }
}

/// Wire shape shared by every error response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    message: String,
    code: String,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let (label, code, message) = match &self.kind {
            ErrorKind::Authentication(auth) => (
                if auth.kind.is_infrastructure() {
                    "Internal Server Error"
                } else {
                    "Authentication Error"
                },
                auth.kind.code().to_string(),
                auth.message.clone(),
            ),
            ErrorKind::BadRequest(reason) => {
                ("Bad Request", "BAD_REQUEST".to_string(), reason.clone())
            }
            ErrorKind::NotFound(reason) => ("Not Found", "NOT_FOUND".to_string(), reason.clone()),
            ErrorKind::Conflict(reason) => ("Conflict", "CONFLICT".to_string(), reason.clone()),
            ErrorKind::Database(detail) => {
                // Log the cause server-side, return a generic message
                tracing::error!(target: "api.store", error = %detail, "Store operation failed");
                (
                    "Internal Server Error",
                    "DATABASE_ERROR".to_string(),
                    "An internal database error occurred".to_string(),
                )
            }
            ErrorKind::Upstream(detail) => {
                tracing::error!(target: "api.upstream", error = %detail, "Upstream call failed");
                (
                    "Bad Gateway",
                    "UPSTREAM_ERROR".to_string(),
                    "An upstream service call failed".to_string(),
                )
            }
            ErrorKind::Internal => (
                "Internal Server Error",
                "INTERNAL_ERROR".to_string(),
                "An internal error occurred".to_string(),
            ),
        };

        let body = ErrorBody {
            error: label.to_string(),
            message,
            code,
            timestamp: Utc::now().to_rfc3339(),
            request_id: self.request_id,
        };

        (status, Json(body)).into_response()
    }
}
