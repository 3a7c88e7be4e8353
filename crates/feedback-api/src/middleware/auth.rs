//! Authentication middleware.
//!
//! Both layers resolve an [`Identity`](crate::auth::gateway::Identity)
//! through the gateway and attach it to the request's extensions for
//! handlers to consume. Write routes use the API-key layer; read routes use
//! the JWT layer.

use crate::errors::ApiError;
use crate::routes::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

const API_KEY_HEADER: &str = "x-api-key";
const TARGET_ID_HEADER: &str = "x-target-id";

fn header_str<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Require a valid `X-API-Key` / `X-Target-Id` pair.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = state.gateway.authenticate_api_key(
        header_str(&request, API_KEY_HEADER),
        header_str(&request, TARGET_ID_HEADER),
    );

    match identity {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            warn!(
                target: "api.auth",
                code = err.kind.code(),
                request_id = %err.request_id,
                "api key authentication rejected"
            );
            ApiError::from(err).into_response()
        }
    }
}

/// Require a valid `Authorization: Bearer <jwt>` header.
pub async fn require_jwt(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = header_str(&request, header::AUTHORIZATION.as_str()).map(str::to_string);

    match state
        .gateway
        .authenticate_bearer(authorization.as_deref())
        .await
    {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            warn!(
                target: "api.auth",
                code = err.kind.code(),
                request_id = %err.request_id,
                "bearer authentication rejected"
            );
            ApiError::from(err).into_response()
        }
    }
}
