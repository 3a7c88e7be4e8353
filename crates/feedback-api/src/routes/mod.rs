//! HTTP routes for the feedback API.
//!
//! Defines the Axum router and application state.

use crate::auth::AuthGateway;
use crate::config::Config;
use crate::handlers;
use crate::middleware::{require_api_key, require_jwt};
use crate::services::{FeedbackService, ReportService};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::warn;

/// Application state shared across all handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Feedback item service.
    pub feedback: FeedbackService,

    /// Report service.
    pub reports: ReportService,

    /// Authentication gateway (API-key registry + JWT verifier).
    pub gateway: AuthGateway,
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `POST /feedback` - Submit feedback (API-key authenticated)
/// - `GET /feedback` - List feedback (JWT authenticated)
/// - `GET /reports` - List reports (JWT authenticated)
/// - `GET /reports/{targetId}/{reportId}` - Fetch one report (JWT authenticated)
/// - `GET /ping` - Liveness probe (public)
/// - CORS, TraceLayer for request logging, 30 second request timeout
pub fn build_routes(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/ping", get(handlers::health::ping))
        .with_state(state.clone());

    // Write route: API-key authentication
    let api_key_routes = Router::new()
        .route(
            "/feedback",
            axum::routing::post(handlers::feedback::create_feedback),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .with_state(state.clone());

    // Read routes: JWT authentication
    let jwt_routes = Router::new()
        .route("/feedback", get(handlers::feedback::list_feedback))
        .route("/reports", get(handlers::reports::list_reports))
        .route(
            "/reports/:target_id/:report_id",
            get(handlers::reports::get_report),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_jwt))
        .with_state(state);

    // Merge routes and apply global middleware layers
    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. CorsLayer - Preflight and response headers
    // 3. TraceLayer - Log request details (outermost)
    public_routes
        .merge(api_key_routes)
        .merge(jwt_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}

/// CORS policy from the configured origin list. A lone `*` allows any
/// origin; otherwise only the listed origins are echoed back.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(target: "api.config", origin = %o, "skipping unparseable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::HeaderName::from_static("x-api-key"),
            header::HeaderName::from_static("x-target-id"),
        ])
        .max_age(Duration::from_secs(86400))
}
