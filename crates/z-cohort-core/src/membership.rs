//! Membership types for z-cohort.
//!
//! A membership records that a user belongs to a segment. The pair
//! `(user_id, segment_id)` is unique and memberships are never updated in
//! place: they are created once and later deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{SegmentId, User, UserId};

/// A user's membership in a segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// The member.
    pub user_id: UserId,

    /// The segment.
    pub segment_id: SegmentId,

    /// When the user was assigned. Immutable.
    pub assigned_at: DateTime<Utc>,
}

impl Membership {
    /// Create a membership assigned now.
    #[must_use]
    pub fn new(user_id: UserId, segment_id: SegmentId) -> Self {
        Self {
            user_id,
            segment_id,
            assigned_at: Utc::now(),
        }
    }
}

/// Per-user membership summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStats {
    /// The user ID.
    pub user_id: UserId,
    /// The user's name.
    pub user_name: String,
    /// Number of segments the user belongs to.
    pub segment_count: usize,
    /// Most recent assignment, if any.
    pub last_segment_added_at: Option<DateTime<Utc>>,
}

impl UserStats {
    /// Summarize a user's memberships.
    #[must_use]
    pub fn new(user: &User, memberships: &[Membership]) -> Self {
        Self {
            user_id: user.id,
            user_name: user.name.clone(),
            segment_count: memberships.len(),
            last_segment_added_at: memberships.iter().map(|m| m.assigned_at).max(),
        }
    }
}
