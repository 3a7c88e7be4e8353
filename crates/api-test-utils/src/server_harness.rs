//! Test server harness for E2E testing.
//!
//! Provides `TestApiServer` for spawning real feedback-api instances in
//! tests, backed by the in-memory store and a mocked JWKS endpoint.

use crate::token_builders::{TestClaims, TestKeypair};
use feedback_api::auth::{AuthGateway, JwksClient, JwtVerifier};
use feedback_api::config::Config;
use feedback_api::routes::{self, AppState};
use feedback_api::services::{FeedbackService, ReportService};
use feedback_api::store::InMemoryStore;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// API key accepted by the spawned server.
pub const TEST_API_KEY: &str = "test-api-key";

/// Target id bound to [`TEST_API_KEY`].
pub const TEST_TARGET_ID: &str = "test-target";

/// Test harness for spawning the feedback API server in E2E tests.
///
/// The server binds to a random port, authenticates bearer tokens against a
/// wiremock JWKS endpoint seeded with the harness keypair, and stores items
/// in memory.
pub struct TestApiServer {
    addr: SocketAddr,
    keypair: TestKeypair,
    jwks_server: MockServer,
    feedback_store: Arc<InMemoryStore>,
    reports_store: Arc<InMemoryStore>,
    _handle: JoinHandle<()>,
}

impl TestApiServer {
    /// Spawn a new test server instance.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(HashMap::new()).await
    }

    /// Spawn with extra environment overrides merged over the defaults.
    pub async fn spawn_with_vars(
        overrides: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        // Mock JWKS endpoint seeded with the harness keypair
        let jwks_server = MockServer::start().await;
        let keypair = TestKeypair::new(1, "test-key-01");

        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(keypair.jwks_body()))
            .mount(&jwks_server)
            .await;

        let mut vars = HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://test/test".to_string(),
            ),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            (
                "JWKS_URL".to_string(),
                format!("{}/.well-known/jwks.json", jwks_server.uri()),
            ),
            (
                "API_KEYS".to_string(),
                format!(
                    r#"[{{"key":"{}","targetId":"{}"}}]"#,
                    TEST_API_KEY, TEST_TARGET_ID
                ),
            ),
        ]);
        vars.extend(overrides);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let jwks_client = Arc::new(JwksClient::new(config.jwks_url.clone()));
        let verifier = Arc::new(JwtVerifier::new(
            jwks_client,
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
            config.jwt_clock_skew_seconds,
        ));
        let gateway = AuthGateway::new(config.api_keys.clone(), verifier);

        let feedback_store = Arc::new(InMemoryStore::new());
        let reports_store = Arc::new(InMemoryStore::new());

        let state = Arc::new(AppState {
            feedback: FeedbackService::new(feedback_store.clone()),
            reports: ReportService::new(reports_store.clone()),
            gateway,
            config,
        });

        let app = routes::build_routes(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            keypair,
            jwks_server,
            feedback_store,
            reports_store,
            _handle: handle,
        })
    }

    /// Base URL of the running server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Store backing the feedback collection, for seeding and assertions.
    pub fn feedback_store(&self) -> Arc<InMemoryStore> {
        self.feedback_store.clone()
    }

    /// Store backing the reports collection, for seeding and assertions.
    pub fn reports_store(&self) -> Arc<InMemoryStore> {
        self.reports_store.clone()
    }

    /// A bearer token the server will accept.
    pub fn create_valid_token(&self) -> String {
        self.keypair.sign_token(&TestClaims::valid("test-user"))
    }

    /// A bearer token that expired an hour ago.
    pub fn create_expired_token(&self) -> String {
        self.keypair.sign_token(&TestClaims::expired("test-user"))
    }

    /// A bearer token issued an hour in the future.
    pub fn create_future_iat_token(&self) -> String {
        self.keypair
            .sign_token(&TestClaims::future_iat("test-user"))
    }

    /// A structurally valid token signed by a key absent from the JWKS.
    pub fn create_unknown_kid_token(&self) -> String {
        let other = TestKeypair::new(2, "unknown-key");
        other.sign_token(&TestClaims::valid("test-user"))
    }

    /// Replace the JWKS endpoint with a 500 response, simulating an
    /// unreachable identity provider.
    pub async fn break_jwks(&self) {
        self.jwks_server.reset().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&self.jwks_server)
            .await;
    }
}

impl Drop for TestApiServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
