//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{distribution, health, segments, users};
use crate::state::AppState;

/// Maximum concurrent requests for distribution endpoints.
/// Each distribution scans the whole user population.
const DISTRIBUTE_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check (503 when the store is unreachable)
///
/// ## Users
/// - `POST /v1/users` - Create user
/// - `GET /v1/users` - List users (`?active_only=true`)
/// - `GET /v1/users/:id` - Get user with its segments
/// - `PATCH /v1/users/:id` - Update name / active flag
/// - `DELETE /v1/users/:id` - Delete user and its memberships
/// - `GET /v1/users/:id/segments` - Slugs of the user's segments
/// - `GET /v1/users/:id/stats` - Membership summary
/// - `POST /v1/users/assign` - Assign a user to a segment
/// - `DELETE /v1/users/unassign` - Remove a user from a segment
///
/// ## Segments
/// - `POST /v1/segments` - Create segment
/// - `GET /v1/segments` - List segments
/// - `GET /v1/segments/:id` - Get segment
/// - `GET /v1/segments/by-slug/:slug` - Get segment by slug
/// - `PATCH /v1/segments/:id` - Update name / description
/// - `DELETE /v1/segments/:id` - Delete segment and its memberships
/// - `GET /v1/segments/:id/users` - Member IDs
///
/// ## Distribution (rate-limited)
/// - `POST /v1/distribute` - Distribute a segment
/// - `POST /v1/segments/:id/distribute` - Same, segment from the path
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    let distribute_routes = Router::new()
        .route("/distribute", post(distribution::distribute))
        .route(
            "/segments/:id/distribute",
            post(segments::distribute_segment),
        )
        .layer(ConcurrencyLimitLayer::new(DISTRIBUTE_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        // Users
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/assign", post(users::assign))
        .route("/users/unassign", delete(users::unassign))
        .route(
            "/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/:id/segments", get(users::get_user_segments))
        .route("/users/:id/stats", get(users::get_user_stats))
        // Segments
        .route(
            "/segments",
            post(segments::create_segment).get(segments::list_segments),
        )
        .route("/segments/by-slug/:slug", get(segments::get_segment_by_slug))
        .route(
            "/segments/:id",
            get(segments::get_segment)
                .patch(segments::update_segment)
                .delete(segments::delete_segment),
        )
        .route("/segments/:id/users", get(segments::list_segment_users))
        .merge(distribute_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Global middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
