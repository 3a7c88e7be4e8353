//! End-to-end tests for the feedback routes.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use api_test_utils::{TestApiServer, TEST_API_KEY, TEST_TARGET_ID};
use serde_json::json;

async fn submit_feedback(
    client: &reqwest::Client,
    server: &TestApiServer,
    message: &str,
) -> Result<serde_json::Value> {
    let response = client
        .post(format!("{}/feedback", server.url()))
        .header("X-API-Key", TEST_API_KEY)
        .header("X-Target-Id", TEST_TARGET_ID)
        .json(&json!({"type": "bug", "message": message}))
        .send()
        .await?;
    assert_eq!(response.status(), 201);
    Ok(response.json().await?)
}

#[tokio::test]
async fn test_create_then_list_feedback() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let created = submit_feedback(&client, &server, "first report").await?;
    assert_eq!(created["type"], "bug");
    assert_eq!(created["message"], "first report");

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
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["feedbackId"], created["feedbackId"]);
    assert_eq!(body["hasMore"], false);
    assert!(body.get("nextToken").is_none());

    Ok(())
}

#[tokio::test]
async fn test_create_feedback_rejects_blank_message() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/feedback", server.url()))
        .header("X-API-Key", TEST_API_KEY)
        .header("X-Target-Id", TEST_TARGET_ID)
        .json(&json!({"type": "bug", "message": "   "}))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(body["message"], "type and message are required");

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_requires_target_id_param() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_valid_token();
    let response = client
        .get(format!("{}/feedback", server.url()))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["message"], "targetId query parameter is required");

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_paginates_most_recent_first() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    for n in 0..5 {
        submit_feedback(&client, &server, &format!("item {}", n)).await?;
        // Sort keys carry millisecond timestamps; keep creation order unambiguous
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let token = server.create_valid_token();
    let first: serde_json::Value = client
        .get(format!(
            "{}/feedback?targetId={}&limit=3",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?
        .json()
        .await?;

    let first_items = first["items"].as_array().unwrap();
    assert_eq!(first_items.len(), 3);
    assert_eq!(first["hasMore"], true);
    // Sort keys embed the creation timestamp, so descending scan is newest first
    assert_eq!(first_items[0]["message"], "item 4");
    assert_eq!(first_items[2]["message"], "item 2");

    let next_token = first["nextToken"].as_str().unwrap();
    let second: serde_json::Value = client
        .get(format!(
            "{}/feedback?targetId={}&limit=3&nextToken={}",
            server.url(),
            TEST_TARGET_ID,
            next_token
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?
        .json()
        .await?;

    let second_items = second["items"].as_array().unwrap();
    assert_eq!(second_items.len(), 2);
    assert_eq!(second_items[0]["message"], "item 1");
    assert_eq!(second_items[1]["message"], "item 0");
    assert_eq!(second["hasMore"], false);

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_zero_limit_still_pages() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    submit_feedback(&client, &server, "only item").await?;

    let token = server.create_valid_token();
    let body: serde_json::Value = client
        .get(format!(
            "{}/feedback?targetId={}&limit=0",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?
        .json()
        .await?;

    // limit=0 is treated as 1 so a page can always carry a usable cursor
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(body["hasMore"], false);
    assert!(body.get("nextToken").is_none());

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_rejects_garbage_token() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_valid_token();
    let response = client
        .get(format!(
            "{}/feedback?targetId={}&nextToken=%21%21not-base64",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    Ok(())
}

#[tokio::test]
async fn test_list_feedback_processed_filter() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let first = submit_feedback(&client, &server, "handled").await?;
    submit_feedback(&client, &server, "still open").await?;

    // Flip the first item to processed through the service layer
    let service = feedback_api::services::feedback::FeedbackService::new(server.feedback_store());
    service
        .mark_as_processed(
            TEST_TARGET_ID,
            first["feedbackId"].as_str().unwrap(),
            "RPT#seed",
        )
        .await?;

    let token = server.create_valid_token();
    let body: serde_json::Value = client
        .get(format!(
            "{}/feedback?targetId={}&processed=false",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?
        .json()
        .await?;

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["message"], "still open");

    Ok(())
}
