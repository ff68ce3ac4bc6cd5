//! User and membership integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::{json, Value};

// ============================================================================
// User CRUD
// ============================================================================

#[tokio::test]
async fn create_user_allocates_ids() {
    let harness = TestHarness::new();

    let first = harness.create_user("Ada").await;
    let second = harness.create_user("Grace").await;

    assert!(second > first);

    let response = harness.server.get(&format!("/v1/users/{first}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["user"]["name"], "Ada");
    assert_eq!(body["user"]["active"], true);
    assert_eq!(body["segments"], json!([]));
}

#[tokio::test]
async fn create_user_with_explicit_id() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/users")
        .json(&json!({ "id": 500, "name": "Linus" }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], 500);

    // Allocation continues after the supplied id
    let next = harness.create_user("Ken").await;
    assert!(next > 500);

    // Taking the same id again is rejected
    harness
        .server
        .post("/v1/users")
        .json(&json!({ "id": 500, "name": "Dennis" }))
        .await
        .assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_user_rejects_blank_name() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/users")
        .json(&json!({ "name": "  " }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "invalid_argument");
}

#[tokio::test]
async fn create_inactive_user() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/users")
        .json(&json!({ "name": "Dormant", "active": false }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["active"], false);
}

#[tokio::test]
async fn list_users_filters_inactive() {
    let harness = TestHarness::new();
    let ids = harness.create_users(3).await;

    harness
        .server
        .patch(&format!("/v1/users/{}", ids[1]))
        .json(&json!({ "active": false }))
        .await
        .assert_status_ok();

    let all: Vec<Value> = harness.server.get("/v1/users").await.json();
    assert_eq!(all.len(), 3);

    let active: Vec<Value> = harness
        .server
        .get("/v1/users")
        .add_query_param("active_only", true)
        .await
        .json();
    let active_ids: Vec<u64> = active.iter().filter_map(|u| u["id"].as_u64()).collect();
    assert_eq!(active_ids, vec![ids[0], ids[2]]);
}

#[tokio::test]
async fn update_user_name() {
    let harness = TestHarness::new();
    let id = harness.create_user("Old").await;

    let response = harness
        .server
        .patch(&format!("/v1/users/{id}"))
        .json(&json!({ "name": "New" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["name"], "New");
    assert_eq!(body["active"], true);
}

#[tokio::test]
async fn missing_user_is_not_found() {
    let harness = TestHarness::new();

    harness.server.get("/v1/users/999").await.assert_status_not_found();
    harness
        .server
        .patch("/v1/users/999")
        .json(&json!({ "name": "x" }))
        .await
        .assert_status_not_found();
    harness
        .server
        .delete("/v1/users/999")
        .await
        .assert_status_not_found();
    harness
        .server
        .get("/v1/users/999/segments")
        .await
        .assert_status_not_found();
    harness
        .server
        .get("/v1/users/999/stats")
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn delete_user_removes_memberships() {
    let harness = TestHarness::new();
    let user = harness.create_user("Ada").await;
    let beta = harness.create_segment("Beta", "BETA").await;
    let gamma = harness.create_segment("Gamma", "GAMMA").await;
    harness.assign(user, beta).await;
    harness.assign(user, gamma).await;

    let response = harness.server.delete(&format!("/v1/users/{user}")).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["deleted"], true);
    assert_eq!(body["memberships_removed"], 2);

    assert!(harness.segment_users(beta).await.is_empty());
    assert!(harness.segment_users(gamma).await.is_empty());
}

// ============================================================================
// Assignment
// ============================================================================

#[tokio::test]
async fn assign_and_list_segments() {
    let harness = TestHarness::new();
    let user = harness.create_user("Ada").await;
    let beta = harness.create_segment("Beta", "BETA").await;
    let gamma = harness.create_segment("Gamma", "GAMMA").await;

    harness.assign(user, gamma).await;
    harness.assign(user, beta).await;

    let slugs: Vec<String> = harness
        .server
        .get(&format!("/v1/users/{user}/segments"))
        .await
        .json();
    assert_eq!(slugs, vec!["BETA".to_string(), "GAMMA".to_string()]);

    let body: Value = harness.server.get(&format!("/v1/users/{user}")).await.json();
    assert_eq!(body["segments"][0]["slug"], "BETA");
    assert_eq!(body["segments"][1]["slug"], "GAMMA");
}

#[tokio::test]
async fn assign_twice_conflicts() {
    let harness = TestHarness::new();
    let user = harness.create_user("Ada").await;
    let beta = harness.create_segment("Beta", "BETA").await;
    harness.assign(user, beta).await;

    let response = harness
        .server
        .post("/v1/users/assign")
        .json(&json!({ "user_id": user, "segment_id": beta }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "conflict");
    assert_eq!(harness.segment_users(beta).await, vec![user]);
}

#[tokio::test]
async fn assign_requires_existing_user_and_segment() {
    let harness = TestHarness::new();
    let user = harness.create_user("Ada").await;
    let beta = harness.create_segment("Beta", "BETA").await;

    harness
        .server
        .post("/v1/users/assign")
        .json(&json!({ "user_id": 999, "segment_id": beta }))
        .await
        .assert_status_not_found();
    harness
        .server
        .post("/v1/users/assign")
        .json(&json!({ "user_id": user, "segment_id": 999 }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn unassign_removes_membership() {
    let harness = TestHarness::new();
    let user = harness.create_user("Ada").await;
    let beta = harness.create_segment("Beta", "BETA").await;
    harness.assign(user, beta).await;

    harness
        .server
        .delete("/v1/users/unassign")
        .json(&json!({ "user_id": user, "segment_id": beta }))
        .await
        .assert_status_ok();
    assert!(harness.segment_users(beta).await.is_empty());

    // Removal is a DELETE; POST is not routed
    harness
        .server
        .post("/v1/users/unassign")
        .json(&json!({ "user_id": user, "segment_id": beta }))
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);

    // Second removal has nothing to remove
    harness
        .server
        .delete("/v1/users/unassign")
        .json(&json!({ "user_id": user, "segment_id": beta }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn user_stats_count_memberships() {
    let harness = TestHarness::new();
    let user = harness.create_user("Ada").await;

    let empty: Value = harness
        .server
        .get(&format!("/v1/users/{user}/stats"))
        .await
        .json();
    assert_eq!(empty["segment_count"], 0);
    assert!(empty["last_segment_added_at"].is_null());

    let beta = harness.create_segment("Beta", "BETA").await;
    let gamma = harness.create_segment("Gamma", "GAMMA").await;
    harness.assign(user, beta).await;
    harness.assign(user, gamma).await;

    let stats: Value = harness
        .server
        .get(&format!("/v1/users/{user}/stats"))
        .await
        .json();
    assert_eq!(stats["user_id"], user);
    assert_eq!(stats["user_name"], "Ada");
    assert_eq!(stats["segment_count"], 2);
    assert!(stats["last_segment_added_at"].is_string());
}
