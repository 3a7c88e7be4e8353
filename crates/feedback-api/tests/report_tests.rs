//! End-to-end tests for the report routes.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use api_test_utils::{TestApiServer, TEST_TARGET_ID};
use feedback_api::models::{CreateReportInput, ReportItem, TriggerType};
use feedback_api::services::ReportService;
use serde_json::json;

async fn seed_report(server: &TestApiServer, analysis: serde_json::Value) -> Result<ReportItem> {
    let service = ReportService::new(server.reports_store());
    let report = service
        .create_report(
            TEST_TARGET_ID,
            CreateReportInput {
                trigger_type: TriggerType::Scheduled,
                collected_data: None,
                analysis: Some(analysis),
                actions: None,
                status: None,
            },
        )
        .await?;
    Ok(report)
}

#[tokio::test]
async fn test_list_reports_returns_seeded_items() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let report = seed_report(&server, json!({"summary": "weekly digest"})).await?;

    let token = server.create_valid_token();
    let response = client
        .get(format!(
            "{}/reports?targetId={}",
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
    assert_eq!(items[0]["reportId"], report.report_id);
    assert_eq!(items[0]["status"], "pending");
    assert_eq!(items[0]["analysis"]["summary"], "weekly digest");

    Ok(())
}

#[tokio::test]
async fn test_list_reports_requires_target_id_param() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_valid_token();
    let response = client
        .get(format!("{}/reports", server.url()))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 400);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["message"], "targetId query parameter is required");

    Ok(())
}

#[tokio::test]
async fn test_get_report_by_id() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let report = seed_report(&server, json!({"summary": "one-off"})).await?;

    let token = server.create_valid_token();
    let response = client
        .get(format!(
            "{}/reports/{}/{}",
            server.url(),
            TEST_TARGET_ID,
            urlencoded(&report.report_id)
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["reportId"], report.report_id);
    assert_eq!(body["triggerType"], "scheduled");

    Ok(())
}

#[tokio::test]
async fn test_get_missing_report_is_404() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    let token = server.create_valid_token();
    let response = client
        .get(format!(
            "{}/reports/{}/no-such-report",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?;

    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["code"], "NOT_FOUND");
    assert_eq!(
        body["message"],
        format!(
            "Report no-such-report not found for target {}",
            TEST_TARGET_ID
        )
    );

    Ok(())
}

#[tokio::test]
async fn test_list_reports_pagination() -> Result<()> {
    let server = TestApiServer::spawn().await?;
    let client = reqwest::Client::new();

    for n in 0..4 {
        seed_report(&server, json!({"summary": format!("run {}", n)})).await?;
    }

    let token = server.create_valid_token();
    let first: serde_json::Value = client
        .get(format!(
            "{}/reports?targetId={}&limit=3",
            server.url(),
            TEST_TARGET_ID
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(first["items"].as_array().unwrap().len(), 3);
    assert_eq!(first["hasMore"], true);

    let next_token = first["nextToken"].as_str().unwrap();
    let second: serde_json::Value = client
        .get(format!(
            "{}/reports?targetId={}&limit=3&nextToken={}",
            server.url(),
            TEST_TARGET_ID,
            next_token
        ))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["hasMore"], false);

    Ok(())
}

/// Percent-encode the report id so the `#` separators survive as path segments.
fn urlencoded(value: &str) -> String {
    value.replace('#', "%23")
}
