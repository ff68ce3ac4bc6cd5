//! Error types for z-cohort storage.

use z_cohort_core::{CohortError, IdError, SegmentId, UserId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// The user is already a member of the segment.
    #[error("user {user_id} is already assigned to segment {segment_id}")]
    Conflict {
        /// The user.
        user_id: UserId,
        /// The segment.
        segment_id: SegmentId,
    },

    /// A unique field collides with an existing record.
    #[error("{entity} with {field} {value:?} already exists")]
    AlreadyExists {
        /// Kind of record.
        entity: &'static str,
        /// The unique field.
        field: &'static str,
        /// The colliding value.
        value: String,
    },

    /// No identifiers left to allocate.
    #[error("{entity} id sequence exhausted")]
    SequenceExhausted {
        /// Kind of record.
        entity: &'static str,
    },

    /// A lock could not be acquired before the lock timeout.
    #[error("store busy: {0}")]
    Busy(String),

    /// Input rejected by domain validation.
    #[error(transparent)]
    InvalidArgument(#[from] CohortError),
}

impl StoreError {
    /// Shorthand for `NotFound`.
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<IdError> for StoreError {
    fn from(err: IdError) -> Self {
        Self::Serialization(format!("corrupt key: {err}"))
    }
}
