//! # API Test Utilities
//!
//! Shared test utilities for the feedback API service.
//!
//! This crate provides:
//! - Ed25519 token fixtures (`TestKeypair`, `TestClaims`) for signing JWTs
//!   that verify against a mocked JWKS endpoint
//! - Server test harness (`TestApiServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use api_test_utils::TestApiServer;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestApiServer::spawn().await?;
//!     let client = reqwest::Client::new();
//!
//!     let response = client
//!         .get(format!("{}/ping", server.url()))
//!         .send()
//!         .await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod server_harness;
pub mod token_builders;

pub use server_harness::*;
pub use token_builders::*;
