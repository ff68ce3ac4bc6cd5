//! User and direct membership handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use z_cohort_core::{Membership, Segment, SegmentId, User, UserId, UserPatch, UserStats};
use z_cohort_store::{Store, StoreError, StoreTxn};

use crate::error::ApiError;
use crate::state::AppState;

/// User response.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    /// User ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Whether the user takes part in active-only distributions.
    pub active: bool,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.get(),
            name: user.name.clone(),
            active: user.active,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Segment as listed on a user.
#[derive(Debug, Serialize)]
pub struct SegmentSummary {
    /// Segment ID.
    pub id: u64,
    /// Segment name.
    pub name: String,
    /// Segment slug.
    pub slug: String,
}

impl From<&Segment> for SegmentSummary {
    fn from(segment: &Segment) -> Self {
        Self {
            id: segment.id.get(),
            name: segment.name.clone(),
            slug: segment.slug.to_string(),
        }
    }
}

/// User with the segments it belongs to.
#[derive(Debug, Serialize)]
pub struct UserWithSegmentsResponse {
    /// The user.
    pub user: UserResponse,
    /// Its segments, ordered by segment ID.
    pub segments: Vec<SegmentSummary>,
}

/// Membership response.
#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    /// User ID.
    pub user_id: u64,
    /// Segment ID.
    pub segment_id: u64,
    /// Assignment timestamp.
    pub assigned_at: String,
}

impl From<&Membership> for MembershipResponse {
    fn from(membership: &Membership) -> Self {
        Self {
            user_id: membership.user_id.get(),
            segment_id: membership.segment_id.get(),
            assigned_at: membership.assigned_at.to_rfc3339(),
        }
    }
}

/// Create user request.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Caller-chosen ID; allocated by the store when absent.
    #[serde(default)]
    pub id: Option<u64>,
    /// Display name.
    pub name: String,
    /// Initial activity flag (default: true).
    #[serde(default)]
    pub active: Option<bool>,
}

/// List users query.
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    /// Only return active users.
    #[serde(default)]
    pub active_only: bool,
}

/// Direct assignment request.
#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    /// The user.
    pub user_id: u64,
    /// The segment.
    pub segment_id: u64,
}

/// Create a user.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .with_store(move |store| {
            store.transaction(|txn| -> Result<User, StoreError> {
                let user = txn.create_user(body.id.map(UserId::new), body.name)?;
                match body.active {
                    Some(false) => txn.update_user(
                        user.id,
                        UserPatch {
                            name: None,
                            active: Some(false),
                        },
                    ),
                    _ => Ok(user),
                }
            })
        })
        .await?;

    tracing::info!(user_id = %user.id, "User created");

    Ok(Json(UserResponse::from(&user)))
}

/// List users ordered by ID.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state
        .with_store(move |store| store.transaction(|txn| txn.list_users(query.active_only)))
        .await?;

    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Get a user with its segments.
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserWithSegmentsResponse>, ApiError> {
    let user_id = UserId::new(user_id);
    let (user, segments) = state
        .with_store(move |store| {
            store.transaction(|txn| {
                let user = txn
                    .get_user(user_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("user not found: {user_id}")))?;
                let segments = member_segments(txn, user_id)?;
                Ok::<_, ApiError>((user, segments))
            })
        })
        .await?;

    Ok(Json(UserWithSegmentsResponse {
        user: UserResponse::from(&user),
        segments: segments.iter().map(SegmentSummary::from).collect(),
    }))
}

/// Update a user's name or activity flag.
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .with_store(move |store| {
            store.transaction(|txn| txn.update_user(UserId::new(user_id), patch))
        })
        .await?;

    tracing::info!(user_id = %user.id, active = user.active, "User updated");

    Ok(Json(UserResponse::from(&user)))
}

/// Delete a user and its memberships.
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state
        .with_store(move |store| store.transaction(|txn| txn.delete_user(UserId::new(user_id))))
        .await?;

    tracing::info!(user_id, memberships_removed = removed, "User deleted");

    Ok(Json(serde_json::json!({
        "deleted": true,
        "memberships_removed": removed
    })))
}

/// List the slugs of a user's segments.
pub async fn get_user_segments(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<Vec<String>>, ApiError> {
    let user_id = UserId::new(user_id);
    let segments = state
        .with_store(move |store| {
            store.transaction(|txn| {
                if txn.get_user(user_id)?.is_none() {
                    return Err(ApiError::NotFound(format!("user not found: {user_id}")));
                }
                member_segments(txn, user_id)
            })
        })
        .await?;

    Ok(Json(segments.iter().map(|s| s.slug.to_string()).collect()))
}

/// Membership summary for a user.
pub async fn get_user_stats(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<u64>,
) -> Result<Json<UserStats>, ApiError> {
    let user_id = UserId::new(user_id);
    let stats = state
        .with_store(move |store| {
            store.transaction(|txn| {
                let user = txn
                    .get_user(user_id)?
                    .ok_or_else(|| ApiError::NotFound(format!("user not found: {user_id}")))?;
                let memberships = txn.list_user_memberships(user_id)?;
                Ok::<_, ApiError>(UserStats::new(&user, &memberships))
            })
        })
        .await?;

    Ok(Json(stats))
}

/// Assign a user to a segment.
///
/// Unlike distribution, assigning an existing member fails with a conflict.
pub async fn assign(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MembershipRequest>,
) -> Result<Json<MembershipResponse>, ApiError> {
    let user_id = UserId::new(body.user_id);
    let segment_id = SegmentId::new(body.segment_id);
    let membership = state
        .with_store(move |store| {
            store.transaction(|txn| txn.create_membership(user_id, segment_id))
        })
        .await?;

    tracing::info!(user_id = %user_id, segment_id = %segment_id, "User assigned to segment");

    Ok(Json(MembershipResponse::from(&membership)))
}

/// Remove a user from a segment.
pub async fn unassign(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MembershipRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = UserId::new(body.user_id);
    let segment_id = SegmentId::new(body.segment_id);
    state
        .with_store(move |store| {
            store.transaction(|txn| txn.delete_membership(user_id, segment_id))
        })
        .await?;

    tracing::info!(user_id = %user_id, segment_id = %segment_id, "User removed from segment");

    Ok(Json(serde_json::json!({
        "user_id": body.user_id,
        "segment_id": body.segment_id,
        "removed": true
    })))
}

/// Segments a user belongs to, ordered by segment ID.
fn member_segments<T: StoreTxn>(txn: &T, user_id: UserId) -> Result<Vec<Segment>, ApiError> {
    let mut segments = Vec::new();
    for membership in txn.list_user_memberships(user_id)? {
        if let Some(segment) = txn.get_segment(membership.segment_id)? {
            segments.push(segment);
        }
    }
    Ok(segments)
}
