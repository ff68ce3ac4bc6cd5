//! Error types for z-cohort.

use crate::ids::IdError;

/// Result type for z-cohort domain operations.
pub type Result<T> = std::result::Result<T, CohortError>;

/// Validation errors raised by the domain types.
///
/// Every variant describes caller input that was rejected. None of them are
/// retried; the HTTP layer reports them as bad requests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CohortError {
    /// Slug is empty, too long or contains characters outside `[A-Z0-9_]`.
    #[error("invalid slug {slug:?}: {reason}")]
    InvalidSlug {
        /// The rejected slug.
        slug: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A name field is empty or too long.
    #[error("invalid {field}: {reason}")]
    InvalidName {
        /// Which name field was rejected.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// Segment description exceeds the maximum length.
    #[error("description too long: {len} characters (max {max})")]
    DescriptionTooLong {
        /// Length of the rejected description.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// Distribution percent outside `[0, 100]` or not a number.
    #[error("percent must be between 0 and 100, got {0}")]
    InvalidPercent(f64),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
