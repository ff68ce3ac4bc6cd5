//! Request and response types for the z-cohort client.
//!
//! Distribution requests and reports, and user stats, are shared with
//! `z-cohort-core` and re-exported from there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use z_cohort_core::{DistributionReport, DistributionRequest, UserOutcome, UserStats};

/// Create user request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateUserRequest {
    /// Caller-chosen ID; allocated by the server when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Display name.
    pub name: String,
    /// Initial activity flag (server default: true).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

impl CreateUserRequest {
    /// Active user with a server-allocated ID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            active: None,
        }
    }

    /// Use a specific ID.
    #[must_use]
    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Partial user update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateUserRequest {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New activity flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// User as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserInfo {
    /// User ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Activity flag.
    pub active: bool,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
}

/// Segment reference inside [`UserWithSegments`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SegmentSummary {
    /// Segment ID.
    pub id: u64,
    /// Segment name.
    pub name: String,
    /// Segment slug.
    pub slug: String,
}

/// A user together with its segments.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserWithSegments {
    /// The user.
    pub user: UserInfo,
    /// The user's segments, ordered by segment ID.
    pub segments: Vec<SegmentSummary>,
}

/// Create segment request.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSegmentRequest {
    /// Display name.
    pub name: String,
    /// Unique slug, `[A-Z0-9_]`.
    pub slug: String,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CreateSegmentRequest {
    /// Segment without a description.
    #[must_use]
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slug: slug.into(),
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Partial segment update. An empty description clears it.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateSegmentRequest {
    /// New display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Segment as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SegmentInfo {
    /// Segment ID.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Unique slug.
    pub slug: String,
    /// Optional description.
    pub description: Option<String>,
    /// Created timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Body for distributing the segment named in the path.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct DistributeSegmentRequest {
    pub percent: f64,
    pub overwrite_existing: bool,
    pub active_only: bool,
}

/// Direct assignment request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct MembershipRequest {
    pub user_id: u64,
    pub segment_id: u64,
}

/// Membership as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MembershipInfo {
    /// User ID.
    pub user_id: u64,
    /// Segment ID.
    pub segment_id: u64,
    /// Assignment timestamp.
    pub assigned_at: DateTime<Utc>,
}

/// Result of deleting a user or segment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeleteResponse {
    /// Always true on success.
    pub deleted: bool,
    /// Memberships removed along with the entity.
    pub memberships_removed: usize,
}

/// Health check response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// API error response body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// API error details.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
}
