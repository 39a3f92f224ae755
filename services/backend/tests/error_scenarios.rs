/// Integration tests for error handling scenarios
mod common;

use axum::http::StatusCode;
use common::{parse_error, test_config, BrokenRepository, TestContext};
use axum_test::TestServer;
use promo_backend::{build_router, state::AppState};
use serde_json::{json, Value};
use std::sync::Arc;

#[tokio::test]
async fn test_validation_error_missing_field() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/promo/redeem")
        .json(&json!({ "code": "STABXXXX" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let (code, message, category) = parse_error(&response.text()).expect("Failed to parse error");
    assert_eq!(code, "invalid_input");
    assert_eq!(category, "Validation");
    assert!(message.contains("deviceId"), "{}", message);
}

#[tokio::test]
async fn test_validation_error_blank_device() {
    let ctx = TestContext::new();
    ctx.seed_codes(&["STABBLANK"], 1, None).await;

    let response = ctx
        .server
        .post("/promo/redeem")
        .json(&json!({ "code": "STABBLANK", "deviceId": "" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let (code, _, _) = parse_error(&response.text()).expect("Failed to parse error");
    assert_eq!(code, "invalid_input");

    let promo = ctx.state.engine.find_code("STABBLANK").await.unwrap();
    assert_eq!(promo.redemptions_used, 0);
}

#[tokio::test]
async fn test_validation_error_device_too_long() {
    let ctx = TestContext::new();
    ctx.seed_codes(&["STABLONG"], 1, None).await;

    let response = ctx
        .server
        .post("/promo/redeem")
        .json(&json!({ "code": "STABLONG", "deviceId": "d".repeat(129) }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let (code, _, _) = parse_error(&response.text()).expect("Failed to parse error");
    assert_eq!(code, "invalid_input");
}

#[tokio::test]
async fn test_non_json_body_rejected() {
    let ctx = TestContext::new();

    let response = ctx.server.post("/promo/redeem").text("code=STABXXXX").await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let (code, message, _) = parse_error(&response.text()).expect("Failed to parse error");
    assert_eq!(code, "invalid_input");
    assert!(message.contains("Content-Type"), "{}", message);
}

#[tokio::test]
async fn test_error_body_shape() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/promo/redeem")
        .json(&json!({ "code": "MISSING", "deviceId": "device-A" }))
        .await;

    let body: Value = response.json();
    let error = body.get("error").expect("error envelope");
    assert_eq!(error["code"], "invalid_code");
    assert_eq!(error["category"], "Redemption");
    assert!(error["message"].is_string());
    assert!(error.get("context").is_none());
}

#[tokio::test]
async fn test_storage_failure_is_server_error() {
    let state = AppState::new(test_config(Some("token")), Arc::new(BrokenRepository));
    let server = TestServer::new(build_router(state)).expect("Failed to start test server");

    let response = server
        .post("/promo/redeem")
        .json(&json!({ "code": "STABXXXX", "deviceId": "device-A" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    let (code, message, category) = parse_error(&response.text()).expect("Failed to parse error");
    assert_eq!(code, "server_error");
    assert_eq!(category, "Internal");
    // Storage details stay in the logs
    assert!(!message.contains("pool"), "{}", message);
}

#[tokio::test]
async fn test_unknown_route() {
    let ctx = TestContext::new();

    let response = ctx.server.get("/promo/unknown").await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
