//! Feedback API
//!
//! Entry point for the feedback collection and evolution report service.
//! Accepts API-key-authenticated feedback writes and JWT-authenticated
//! reads backed by PostgreSQL.

use feedback_api::auth::{AuthGateway, JwksClient, JwtVerifier};
use feedback_api::config::Config;
use feedback_api::routes::{self, AppState};
use feedback_api::services::{FeedbackService, ReportService};
use feedback_api::store::PgPartitionedStore;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feedback_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Feedback API");

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        jwks_url = %config.jwks_url,
        jwt_clock_skew_seconds = config.jwt_clock_skew_seconds,
        api_key_count = config.api_keys.len(),
        "Configuration loaded successfully"
    );

    // Initialize database connection pool
    info!("Connecting to database...");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations").run(&pool).await?;
    info!("Database connection established");

    // One partitioned store per collection
    let feedback_store = Arc::new(PgPartitionedStore::new(pool.clone(), &config.feedback_table)?);
    let reports_store = Arc::new(PgPartitionedStore::new(pool, &config.reports_table)?);

    // Warm the JWKS cache so the first authenticated request does not pay
    // for the fetch; failures here are logged and retried on demand.
    let jwks_client = Arc::new(JwksClient::new(config.jwks_url.clone()));
    jwks_client.hydrate().await;

    let verifier = Arc::new(JwtVerifier::new(
        jwks_client,
        config.jwt_issuer.clone(),
        config.jwt_audience.clone(),
        config.jwt_clock_skew_seconds,
    ));
    let gateway = AuthGateway::new(config.api_keys.clone(), verifier);

    let bind_address = config.bind_address.clone();

    // Create application state
    let state = Arc::new(AppState {
        feedback: FeedbackService::new(feedback_store),
        reports: ReportService::new(reports_store),
        gateway,
        config,
    });

    // Build application routes
    let app = routes::build_routes(state);

    let addr: SocketAddr = bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Feedback API listening on {}", addr);

    // Start server with graceful shutdown support
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Feedback API shutdown complete");

    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
