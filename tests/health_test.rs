//! Integration tests for the health endpoints.

mod helpers;

use axum::http::StatusCode;

#[tokio::test]
async fn test_health_check() {
    let app = helpers::TestApp::new();

    let response = app.request("GET", "/api/health", None).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert_eq!(response.body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_detailed_health_reports_counters() {
    let app = helpers::TestApp::new();
    let alice = app.login("alice").await;
    app.post(&alice, "hello").await;
    app.post(&alice, "").await;
    app.poll(&alice).await;

    let response = app.request("GET", "/api/health/detailed", None).await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["registered_users"], 1);
    assert_eq!(data["history_len"], 1);
    assert_eq!(data["history_capacity"], 1000);
    assert_eq!(data["metrics"]["messages_posted"], 1);
    assert_eq!(data["metrics"]["messages_rejected"], 1);
    assert_eq!(data["metrics"]["polls"], 1);
}
