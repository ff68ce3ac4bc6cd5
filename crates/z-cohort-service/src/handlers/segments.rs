//! Segment handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use z_cohort_core::{
    DistributionReport, DistributionRequest, NewSegment, Segment, SegmentId, SegmentPatch, Slug,
};
use z_cohort_store::{Store, StoreError, StoreTxn};

use crate::error::ApiError;
use crate::state::AppState;

/// Segment response.
#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    /// Segment ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Unique slug.
    pub slug: String,
    /// Optional description.
    pub description: Option<String>,
    /// Created timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl From<&Segment> for SegmentResponse {
    fn from(segment: &Segment) -> Self {
        Self {
            id: segment.id.get(),
            name: segment.name.clone(),
            slug: segment.slug.to_string(),
            description: segment.description.clone(),
            created_at: segment.created_at.to_rfc3339(),
            updated_at: segment.updated_at.to_rfc3339(),
        }
    }
}

/// Create segment request.
///
/// The slug arrives as a plain string so that a malformed one is reported
/// as an invalid argument rather than a body rejection.
#[derive(Debug, Deserialize)]
pub struct CreateSegmentRequest {
    /// Display name.
    pub name: String,
    /// Unique slug, `[A-Z0-9_]`.
    pub slug: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

/// Body of `POST /v1/segments/:id/distribute`.
#[derive(Debug, Deserialize)]
pub struct DistributeSegmentRequest {
    /// Percentage of eligible users to assign.
    pub percent: f64,
    /// Clear existing members first.
    #[serde(default)]
    pub overwrite_existing: bool,
    /// Restrict the population to active users (default: true).
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

fn default_active_only() -> bool {
    true
}

/// Create a segment.
pub async fn create_segment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateSegmentRequest>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let input = NewSegment::new(body.name, body.slug, body.description)?;
    let segment = state
        .with_store(move |store| store.transaction(|txn| txn.create_segment(input)))
        .await?;

    tracing::info!(segment_id = %segment.id, slug = %segment.slug, "Segment created");

    Ok(Json(SegmentResponse::from(&segment)))
}

/// List segments ordered by ID.
pub async fn list_segments(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SegmentResponse>>, ApiError> {
    let segments = state
        .with_store(|store| store.transaction(|txn| txn.list_segments()))
        .await?;

    Ok(Json(segments.iter().map(SegmentResponse::from).collect()))
}

/// Get a segment by ID.
pub async fn get_segment(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<u64>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let segment_id = SegmentId::new(segment_id);
    let segment = state
        .with_store(move |store| store.transaction(|txn| txn.get_segment(segment_id)))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("segment not found: {segment_id}")))?;

    Ok(Json(SegmentResponse::from(&segment)))
}

/// Get a segment by slug.
pub async fn get_segment_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let slug = Slug::parse(slug)?;
    let missing = ApiError::NotFound(format!("segment not found: {slug}"));
    let segment = state
        .with_store(move |store| store.transaction(|txn| txn.get_segment_by_slug(&slug)))
        .await?
        .ok_or(missing)?;

    Ok(Json(SegmentResponse::from(&segment)))
}

/// Update a segment's name or description.
pub async fn update_segment(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<u64>,
    Json(patch): Json<SegmentPatch>,
) -> Result<Json<SegmentResponse>, ApiError> {
    let segment = state
        .with_store(move |store| {
            store.transaction(|txn| txn.update_segment(SegmentId::new(segment_id), patch))
        })
        .await?;

    tracing::info!(segment_id = %segment.id, "Segment updated");

    Ok(Json(SegmentResponse::from(&segment)))
}

/// Delete a segment and its memberships.
pub async fn delete_segment(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<u64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let removed = state
        .with_store(move |store| {
            store.transaction(|txn| txn.delete_segment(SegmentId::new(segment_id)))
        })
        .await?;

    tracing::info!(segment_id, memberships_removed = removed, "Segment deleted");

    Ok(Json(serde_json::json!({
        "deleted": true,
        "memberships_removed": removed
    })))
}

/// List the IDs of a segment's members.
pub async fn list_segment_users(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<u64>,
) -> Result<Json<Vec<u64>>, ApiError> {
    let segment_id = SegmentId::new(segment_id);
    let memberships = state
        .with_store(move |store| {
            store.transaction(|txn| {
                if txn.get_segment(segment_id)?.is_none() {
                    return Err(StoreError::not_found("segment", segment_id));
                }
                txn.list_memberships(segment_id)
            })
        })
        .await?;

    Ok(Json(memberships.iter().map(|m| m.user_id.get()).collect()))
}

/// Randomly assign a percentage of users to the segment in the path.
pub async fn distribute_segment(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<u64>,
    Json(body): Json<DistributeSegmentRequest>,
) -> Result<Json<DistributionReport>, ApiError> {
    let request = DistributionRequest::new(SegmentId::new(segment_id), body.percent)
        .overwrite(body.overwrite_existing)
        .active_only(body.active_only);

    let report = state.distribute(request).await?;

    Ok(Json(report))
}
