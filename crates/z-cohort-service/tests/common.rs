//! Common test utilities for z-cohort integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use serde_json::{json, Value};
use tempfile::TempDir;

use z_cohort_service::{create_router, AppState, ServiceConfig};
use z_cohort_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and a fixed RNG seed.
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    /// Create a harness whose distributions draw from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            distribution_seed: Some(seed),
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
        }
    }

    /// Create a user and return its ID.
    pub async fn create_user(&self, name: &str) -> u64 {
        let response = self
            .server
            .post("/v1/users")
            .json(&json!({ "name": name }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["id"].as_u64().expect("user id")
    }

    /// Create `count` users named `user-N` and return their IDs.
    pub async fn create_users(&self, count: usize) -> Vec<u64> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            ids.push(self.create_user(&format!("user-{i}")).await);
        }
        ids
    }

    /// Create a segment and return its ID.
    pub async fn create_segment(&self, name: &str, slug: &str) -> u64 {
        let response = self
            .server
            .post("/v1/segments")
            .json(&json!({ "name": name, "slug": slug }))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["id"].as_u64().expect("segment id")
    }

    /// Member IDs of a segment.
    pub async fn segment_users(&self, segment_id: u64) -> Vec<u64> {
        let response = self
            .server
            .get(&format!("/v1/segments/{segment_id}/users"))
            .await;
        response.assert_status_ok();
        response.json()
    }

    /// Assign a user to a segment directly.
    pub async fn assign(&self, user_id: u64, segment_id: u64) {
        self.server
            .post("/v1/users/assign")
            .json(&json!({ "user_id": user_id, "segment_id": segment_id }))
            .await
            .assert_status_ok();
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
