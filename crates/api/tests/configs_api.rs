//! HTTP-level integration tests for `/configs` and `/pinned`.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, put_json, TestApp};
use serde_json::json;
use tagsel_core::repository::Config;
use tagsel_core::selection::SelectedTest;

fn config(name: &str) -> Config {
    Config::new(
        name,
        "",
        vec![SelectedTest {
            feature_id: "tp_tunnels".into(),
            feature_name: "tp_tunnels".into(),
            test_type: "ci_night".into(),
            time: 10,
            group_name: "MPLS-TP".into(),
        }],
    )
}

// ---------------------------------------------------------------------------
// Test: GET /api/v1/configs returns an empty list before any save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_configs_empty() {
    let test = TestApp::new();
    let response = get(test.app(), "/api/v1/configs").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["data"]["configs"].as_array().unwrap().is_empty());
    assert!(json["data"]["savedAt"].is_null());
}

// ---------------------------------------------------------------------------
// Test: PUT then GET returns the same configs with a save timestamp
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_and_list_configs() {
    let test = TestApp::new();
    let configs = vec![config("nightly"), config("nightly-1")];

    let response = put_json(test.app(), "/api/v1/configs", json!({ "configs": configs })).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["count"], 2);

    let json = body_json(get(test.app(), "/api/v1/configs").await).await;
    let stored: Vec<Config> = serde_json::from_value(json["data"]["configs"].clone()).unwrap();
    assert_eq!(stored, configs);
    assert!(json["data"]["savedAt"].is_string());
}

// ---------------------------------------------------------------------------
// Test: duplicate names are rejected with 409
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_config_names_are_rejected() {
    let test = TestApp::new();
    let configs = vec![config("nightly"), config("nightly")];

    let response = put_json(test.app(), "/api/v1/configs", json!({ "configs": configs })).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "CONFLICT");
}

// ---------------------------------------------------------------------------
// Test: pinned ids round-trip with duplicates collapsed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pinned_round_trip() {
    let test = TestApp::new();

    let json = body_json(get(test.app(), "/api/v1/pinned").await).await;
    assert!(json["data"]["pinnedConfigs"].as_array().unwrap().is_empty());

    let response = put_json(
        test.app(),
        "/api/v1/pinned",
        json!({ "pinnedConfigs": ["b", "a", "b"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(get(test.app(), "/api/v1/pinned").await).await;
    assert_eq!(json["data"]["pinnedConfigs"], json!(["b", "a"]));
}
