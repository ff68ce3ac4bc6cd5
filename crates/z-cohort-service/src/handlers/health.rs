//! Health check handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`.
    pub status: &'static str,
    /// Service name.
    pub service: &'static str,
    /// Service version.
    pub version: &'static str,
    /// `ok` when every column family can be read, `unavailable` otherwise.
    pub store: &'static str,
}

/// Health check endpoint. Answers 503 while the store cannot be read.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let store_ok = match state.with_store(|store| store.check()).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(error = %err, "Store health check failed");
            false
        }
    };

    let (code, status, store) = if store_ok {
        (StatusCode::OK, "ok", "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
    };

    (
        code,
        Json(HealthResponse {
            status,
            service: "z-cohort",
            version: env!("CARGO_PKG_VERSION"),
            store,
        }),
    )
}
