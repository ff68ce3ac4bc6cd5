//! Distribution integration tests.

mod common;

use std::collections::HashSet;

use common::TestHarness;
use serde_json::{json, Value};

async fn distribute(harness: &TestHarness, body: Value) -> Value {
    let response = harness.server.post("/v1/distribute").json(&body).await;
    response.assert_status_ok();
    response.json()
}

fn assigned_ids(report: &Value) -> Vec<u64> {
    report["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|u| u["assigned"] == true)
        .filter_map(|u| u["user_id"].as_u64())
        .collect()
}

#[tokio::test]
async fn distribute_truncates_target() {
    let harness = TestHarness::new();
    let users = harness.create_users(10).await;
    let segment = harness.create_segment("Beta", "BETA").await;

    let report = distribute(&harness, json!({ "segment_id": segment, "percent": 33 })).await;

    assert_eq!(report["segment_name"], "Beta");
    assert_eq!(report["total_users"], 10);
    assert_eq!(report["eligible_users"], 10);
    assert_eq!(report["newly_assigned"], 3);
    assert_eq!(report["already_assigned"], 0);
    assert_eq!(report["actual_percent"], 30.0);
    assert_eq!(report["requested_percent"], 33.0);

    let assigned = assigned_ids(&report);
    assert_eq!(assigned.len(), 3);
    let population: HashSet<u64> = users.into_iter().collect();
    assert!(assigned.iter().all(|id| population.contains(id)));
    assert_eq!(harness.segment_users(segment).await, assigned);
}

#[tokio::test]
async fn distribute_all_users() {
    let harness = TestHarness::new();
    let users = harness.create_users(7).await;
    let segment = harness.create_segment("Everyone", "EVERYONE").await;

    let report = distribute(&harness, json!({ "segment_id": segment, "percent": 100 })).await;

    assert_eq!(report["newly_assigned"], 7);
    assert_eq!(report["actual_percent"], 100.0);
    assert_eq!(harness.segment_users(segment).await, users);
}

#[tokio::test]
async fn zero_percent_changes_nothing() {
    let harness = TestHarness::new();
    let users = harness.create_users(5).await;
    let segment = harness.create_segment("Beta", "BETA").await;
    harness.assign(users[0], segment).await;

    let report = distribute(&harness, json!({ "segment_id": segment, "percent": 0 })).await;

    assert_eq!(report["newly_assigned"], 0);
    assert_eq!(report["already_assigned"], 1);
    assert_eq!(harness.segment_users(segment).await, vec![users[0]]);
}

#[tokio::test]
async fn existing_members_are_kept_and_not_redrawn() {
    let harness = TestHarness::new();
    let users = harness.create_users(10).await;
    let segment = harness.create_segment("Beta", "BETA").await;
    harness.assign(users[0], segment).await;
    harness.assign(users[1], segment).await;

    let report = distribute(&harness, json!({ "segment_id": segment, "percent": 50 })).await;

    assert_eq!(report["total_users"], 10);
    assert_eq!(report["eligible_users"], 8);
    assert_eq!(report["newly_assigned"], 4);
    assert_eq!(report["already_assigned"], 2);
    assert_eq!(report["actual_percent"], 60.0);

    let members = harness.segment_users(segment).await;
    assert_eq!(members.len(), 6);
    assert!(members.contains(&users[0]));
    assert!(members.contains(&users[1]));

    let kept: Vec<&Value> = report["users"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|u| u["already_assigned"] == true)
        .collect();
    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|u| u["assigned"] == false));
}

#[tokio::test]
async fn overwrite_redraws_from_scratch() {
    let harness = TestHarness::new();
    harness.create_users(10).await;
    let segment = harness.create_segment("Beta", "BETA").await;

    distribute(&harness, json!({ "segment_id": segment, "percent": 80 })).await;
    assert_eq!(harness.segment_users(segment).await.len(), 8);

    let report = distribute(
        &harness,
        json!({ "segment_id": segment, "percent": 20, "overwrite_existing": true }),
    )
    .await;

    assert_eq!(report["eligible_users"], 10);
    assert_eq!(report["newly_assigned"], 2);
    assert_eq!(report["already_assigned"], 0);
    assert_eq!(harness.segment_users(segment).await, assigned_ids(&report));
}

#[tokio::test]
async fn inactive_users_are_skipped_by_default() {
    let harness = TestHarness::new();
    let users = harness.create_users(4).await;
    for user in &users[..2] {
        harness
            .server
            .patch(&format!("/v1/users/{user}"))
            .json(&json!({ "active": false }))
            .await
            .assert_status_ok();
    }
    let segment = harness.create_segment("Beta", "BETA").await;

    let report = distribute(&harness, json!({ "segment_id": segment, "percent": 100 })).await;
    assert_eq!(report["total_users"], 2);
    assert_eq!(harness.segment_users(segment).await, users[2..].to_vec());

    let everyone = distribute(
        &harness,
        json!({ "segment_id": segment, "percent": 100, "active_only": false }),
    )
    .await;
    assert_eq!(everyone["total_users"], 4);
    assert_eq!(everyone["newly_assigned"], 2);
    assert_eq!(harness.segment_users(segment).await, users);
}

#[tokio::test]
async fn inactive_members_count_as_already_assigned() {
    let harness = TestHarness::new();
    let users = harness.create_users(2).await;
    let segment = harness.create_segment("Beta", "BETA").await;
    harness.assign(users[0], segment).await;
    harness
        .server
        .patch(&format!("/v1/users/{}", users[0]))
        .json(&json!({ "active": false }))
        .await
        .assert_status_ok();

    let report = distribute(&harness, json!({ "segment_id": segment, "percent": 0 })).await;

    assert_eq!(report["total_users"], 1);
    assert_eq!(report["newly_assigned"], 0);
    assert_eq!(report["already_assigned"], 1);
    assert_eq!(report["users"][0]["user_id"], users[0]);
    assert_eq!(report["users"][0]["already_assigned"], true);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_distributions_are_serialized() {
    let harness = TestHarness::new();
    harness.create_users(10).await;
    let segment = harness.create_segment("Beta", "BETA").await;
    let body = json!({ "segment_id": segment, "percent": 50 });

    let (first, second) = tokio::join!(
        async { harness.server.post("/v1/distribute").json(&body).await },
        async { harness.server.post("/v1/distribute").json(&body).await },
    );
    first.assert_status_ok();
    second.assert_status_ok();

    // Whichever ran second saw the first one's members: 5 of 10, then 2 of 5
    let first: Value = first.json();
    let second: Value = second.json();
    let mut newly = [
        first["newly_assigned"].as_u64().unwrap(),
        second["newly_assigned"].as_u64().unwrap(),
    ];
    newly.sort_unstable();
    assert_eq!(newly, [2, 5]);
    assert_eq!(harness.segment_users(segment).await.len(), 7);
}

#[tokio::test]
async fn empty_population_reports_message() {
    let harness = TestHarness::new();
    let segment = harness.create_segment("Beta", "BETA").await;

    let report = distribute(&harness, json!({ "segment_id": segment, "percent": 50 })).await;

    assert_eq!(report["message"], "No users available for distribution");
    assert_eq!(report["total_users"], 0);
    assert_eq!(report["newly_assigned"], 0);
    assert_eq!(report["users"], json!([]));
}

#[tokio::test]
async fn invalid_percent_is_rejected() {
    let harness = TestHarness::new();
    harness.create_users(3).await;
    let segment = harness.create_segment("Beta", "BETA").await;

    for percent in [-1.0, 100.5, 250.0] {
        let response = harness
            .server
            .post("/v1/distribute")
            .json(&json!({ "segment_id": segment, "percent": percent }))
            .await;
        response.assert_status_bad_request();
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "invalid_argument");
    }

    assert!(harness.segment_users(segment).await.is_empty());
}

#[tokio::test]
async fn missing_segment_is_not_found() {
    let harness = TestHarness::new();
    harness.create_users(3).await;

    harness
        .server
        .post("/v1/distribute")
        .json(&json!({ "segment_id": 404, "percent": 50 }))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn segment_path_endpoint_matches_body_endpoint() {
    let harness = TestHarness::new();
    harness.create_users(10).await;
    let segment = harness.create_segment("Beta", "BETA").await;

    let response = harness
        .server
        .post(&format!("/v1/segments/{segment}/distribute"))
        .json(&json!({ "percent": 30 }))
        .await;

    response.assert_status_ok();
    let report: Value = response.json();
    assert_eq!(report["segment_id"], segment);
    assert_eq!(report["newly_assigned"], 3);
}

#[tokio::test]
async fn same_seed_same_selection() {
    async fn run(seed: u64) -> Vec<u64> {
        let harness = TestHarness::with_seed(seed);
        harness.create_users(20).await;
        let segment = harness.create_segment("Beta", "BETA").await;
        let report = distribute(&harness, json!({ "segment_id": segment, "percent": 40 })).await;
        assigned_ids(&report)
    }

    let first = run(7).await;
    let second = run(7).await;

    assert_eq!(first.len(), 8);
    assert_eq!(first, second);
}
