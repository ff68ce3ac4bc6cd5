//! Client tests against a mocked z-cohort server.

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use z_cohort_client::{
    ClientError, ClientOptions, CohortClient, CreateSegmentRequest, CreateUserRequest,
    DistributionRequest, UpdateSegmentRequest,
};
use z_cohort_core::{SegmentId, UserId};

fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({ "error": { "code": code, "message": message } })
}

#[tokio::test]
async fn create_user_sends_body_and_parses_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/users"))
        .and(body_json(json!({ "id": 7, "name": "Ada" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "Ada",
            "active": true,
            "created_at": "2024-05-01T12:00:00+00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();
    let user = client
        .create_user(CreateUserRequest::new("Ada").with_id(7))
        .await
        .unwrap();

    assert_eq!(user.id, 7);
    assert!(user.active);
}

#[tokio::test]
async fn list_users_passes_active_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .and(query_param("active_only", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();
    let users = client.list_users(true).await.unwrap();

    assert!(users.is_empty());
}

#[tokio::test]
async fn service_name_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .and(header("x-service-name", "feature-flags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "service": "z-cohort",
            "version": "0.1.0"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CohortClient::with_options(
        server.uri(),
        ClientOptions::with_service_name("feature-flags"),
    )
    .unwrap();
    let health = client.health().await.unwrap();

    assert_eq!(health.status, "ok");
}

#[tokio::test]
async fn distribute_round_trips_report() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/distribute"))
        .and(body_json(json!({
            "segment_id": 3,
            "percent": 50.0,
            "overwrite_existing": true,
            "active_only": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "segment_id": 3,
            "segment_name": "Beta",
            "message": "Segment 'BETA' distributed to 1 users",
            "requested_percent": 50.0,
            "actual_percent": 50.0,
            "total_users": 2,
            "eligible_users": 2,
            "newly_assigned": 1,
            "already_assigned": 0,
            "users": [
                { "user_id": 9, "user_name": "Ada", "assigned": true, "already_assigned": false }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();
    let request = DistributionRequest::new(SegmentId::new(3), 50.0).overwrite(true);
    let report = client.distribute(&request).await.unwrap();

    assert_eq!(report.segment_id, SegmentId::new(3));
    assert_eq!(report.newly_assigned, 1);
    assert_eq!(report.users[0].user_id, UserId::new(9));
}

#[tokio::test]
async fn update_segment_omits_unset_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/segments/4"))
        .and(body_json(json!({ "description": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 4,
            "name": "Beta",
            "slug": "BETA",
            "description": null,
            "created_at": "2024-05-01T12:00:00+00:00",
            "updated_at": "2024-05-02T12:00:00+00:00"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();
    let segment = client
        .update_segment(
            4,
            UpdateSegmentRequest {
                description: Some(String::new()),
                ..UpdateSegmentRequest::default()
            },
        )
        .await
        .unwrap();

    assert!(segment.description.is_none());
    assert!(segment.updated_at > segment.created_at);
}

#[tokio::test]
async fn error_codes_map_to_typed_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/segments/by-slug/NOPE"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(error_body("not_found", "segment not found: NOPE")),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/users/assign"))
        .respond_with(ResponseTemplate::new(409).set_body_json(error_body(
            "conflict",
            "user 1 is already assigned to segment 2",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/segments"))
        .respond_with(ResponseTemplate::new(400).set_body_json(error_body(
            "invalid_argument",
            "invalid slug 'beta'",
        )))
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();

    let missing = client.get_segment_by_slug("NOPE").await.unwrap_err();
    assert!(matches!(missing, ClientError::NotFound(ref m) if m.contains("NOPE")));

    let duplicate = client.assign(1, 2).await.unwrap_err();
    assert!(matches!(duplicate, ClientError::AlreadyAssigned(_)));

    let invalid = client
        .create_segment(CreateSegmentRequest::new("Beta", "beta"))
        .await
        .unwrap_err();
    assert!(matches!(invalid, ClientError::InvalidArgument(_)));
}

#[tokio::test]
async fn unparseable_error_body_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/users/5"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();
    let err = client.delete_user(5).await.unwrap_err();

    match err {
        ClientError::Api { code, status, .. } => {
            assert_eq!(code, "unknown");
            assert_eq!(status, 502);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unassign_sends_delete_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v1/users/unassign"))
        .and(body_json(json!({ "user_id": 3, "segment_id": 9 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user_id": 3,
            "segment_id": 9,
            "removed": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();
    client.unassign(3, 9).await.unwrap();
}

#[tokio::test]
async fn undecodable_success_body_is_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = CohortClient::new(server.uri()).unwrap();
    let err = client.list_users(false).await.unwrap_err();

    assert!(matches!(err, ClientError::Http(_)), "got {err:?}");
}
