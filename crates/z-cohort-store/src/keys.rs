//! Key encoding utilities for `RocksDB`.
//!
//! Identifiers are encoded big-endian so that iteration order matches numeric
//! order. Composite keys are plain concatenations of two 8-byte identifiers.

use z_cohort_core::{IdError, SegmentId, Slug, UserId};

/// Sequence key for user ids.
pub const USER_SEQUENCE: &[u8] = b"users";

/// Sequence key for segment ids.
pub const SEGMENT_SEQUENCE: &[u8] = b"segments";

/// Create a user key from a user ID.
#[must_use]
pub fn user_key(user_id: UserId) -> Vec<u8> {
    user_id.to_be_bytes().to_vec()
}

/// Create a segment key from a segment ID.
#[must_use]
pub fn segment_key(segment_id: SegmentId) -> Vec<u8> {
    segment_id.to_be_bytes().to_vec()
}

/// Create a slug index key.
#[must_use]
pub fn slug_key(slug: &Slug) -> Vec<u8> {
    slug.as_str().as_bytes().to_vec()
}

/// Create a segment name index key.
#[must_use]
pub fn segment_name_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Create a membership key.
///
/// Format: `segment_id (8 bytes) || user_id (8 bytes)`
#[must_use]
pub fn membership_key(segment_id: SegmentId, user_id: UserId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&segment_id.to_be_bytes());
    key.extend_from_slice(&user_id.to_be_bytes());
    key
}

/// Create a user-membership index key.
///
/// Format: `user_id (8 bytes) || segment_id (8 bytes)`
#[must_use]
pub fn user_membership_key(user_id: UserId, segment_id: SegmentId) -> Vec<u8> {
    let mut key = Vec::with_capacity(16);
    key.extend_from_slice(&user_id.to_be_bytes());
    key.extend_from_slice(&segment_id.to_be_bytes());
    key
}

/// Prefix for iterating all memberships of a segment.
#[must_use]
pub fn segment_memberships_prefix(segment_id: SegmentId) -> Vec<u8> {
    segment_id.to_be_bytes().to_vec()
}

/// Prefix for iterating all memberships of a user.
#[must_use]
pub fn user_memberships_prefix(user_id: UserId) -> Vec<u8> {
    user_id.to_be_bytes().to_vec()
}

/// Extract the user ID from a membership key.
///
/// # Errors
///
/// Returns an error if the key is shorter than 16 bytes.
pub fn extract_user_id_from_membership_key(key: &[u8]) -> Result<UserId, IdError> {
    UserId::from_be_slice(key.get(8..).unwrap_or_default())
}

/// Extract the segment ID from a user-membership index key.
///
/// # Errors
///
/// Returns an error if the key is shorter than 16 bytes.
pub fn extract_segment_id_from_user_key(key: &[u8]) -> Result<SegmentId, IdError> {
    SegmentId::from_be_slice(key.get(8..).unwrap_or_default())
}
