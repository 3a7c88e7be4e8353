//! Authentication integration tests.
//!
//! Exercises both schemes end to end: the API-key gate on the write route
//! and JWT validation on the read routes, using a mocked JWKS server.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use api_test_utils::{TestApiServer, TEST_API_KEY, TEST_TARGET_ID};
use serde_json::json;

fn feedback_body() -> serde_json::Value {
    json!({"type": "bug", "message": "crash on save"})
}

// =============================================================================
// API key authentication (POST /feedback)
// =============================================================================

#[tokio::test]
async fn test_create_feedback_with_valid_key() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/feedback", server.url()))
        .header("X-API-Key", TEST_API_KEY)
        .header("X-Target-Id", TEST_TARGET_ID)
        .json(&feedback_body())
        .send()
        .await?;

    assert_eq!(response.status(), 201);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["targetId"], TEST_TARGET_ID);
    assert!(body["feedbackId"].as_str().unwrap().starts_with("FB#"));
    assert_eq!(body["processed"], false);

    Ok(())
}

#[tokio::test]
async fn test_create_feedback_missing_api_key() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/feedback", server.url()))
        .header("X-Target-Id", TEST_TARGET_ID)
        .json(&feedback_body())
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["error"], "Authentication Error");
    assert_eq!(body["code"], "MISSING_API_KEY");
    assert!(body["requestId"].as_str().unwrap().starts_with("req_"));

    Ok(())
}

#[tokio::test]
async fn test_create_feedback_missing_target_id() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/feedback", server.url()))
        .header("X-API-Key", TEST_API_KEY)
        .json(&feedback_body())
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "MISSING_TARGET_ID");

    Ok(())
}

#[tokio::test]
async fn test_create_feedback_mismatched_target_rejected() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    // Valid key, but presented with another tenant's target id
    let response = client
        .post(format!("{}/feedback", server.url()))
        .header("X-API-Key", TEST_API_KEY)
        .header("X-Target-Id", "someone-elses-target")
        .json(&feedback_body())
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_API_KEY");

    Ok(())
}

#[tokio::test]
async fn test_create_feedback_unknown_key_rejected() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/feedback", server.url()))
        .header("X-API-Key", "wrong-key")
        .header("X-Target-Id", TEST_TARGET_ID)
        .json(&feedback_body())
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_API_KEY");

    Ok(())
}

// =============================================================================
// JWT authentication (GET /feedback, GET /reports)
// =============================================================================

#[tokio::test]
async fn test_list_feedback_with_valid_token() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_valid_token();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert!(body["items"].as_array().unwrap().is_empty());
    assert_eq!(body["hasMore"], false);

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_missing_authorization() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "MISSING_AUTHORIZATION");

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_rejects_non_bearer_scheme() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", "Basic abc123")
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_AUTHORIZATION_FORMAT");

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_rejects_expired_token() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_expired_token();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_JWT");

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_rejects_future_iat_token() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_future_iat_token();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_rejects_unknown_kid() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_unknown_kid_token();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "INVALID_JWT");

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_rejects_malformed_token() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", "Bearer not.a.valid.jwt")
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_rejects_oversized_token() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    // Over the 8KB token size limit
    let oversized_token = "a".repeat(9000);

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", oversized_token))
        .send()
        .await?;

    assert_eq!(response.status(), 401);

    Ok(())
}

#[tokio::test]
async fn test_jwks_outage_is_a_server_fault() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    // Break the JWKS endpoint before any fetch has populated the cache
    server.break_jwks().await;

    let token = server.create_valid_token();

    let response = client
        .get(format!(
            "{}/feedback?targetId={}",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "JWT_VERIFICATION_ERROR");
    assert_eq!(body["error"], "Internal Server Error");

    Ok(())
}

// =============================================================================
// Public routes
// =============================================================================

#[tokio::test]
async fn test_ping_is_public() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/ping", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "feedback-api");
    assert!(body["timestamp"].is_string());

    Ok(())
}
