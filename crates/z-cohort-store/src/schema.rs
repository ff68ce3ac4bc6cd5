//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// User records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Segment records, keyed by `segment_id`.
    pub const SEGMENTS: &str = "segments";

    /// Unique index: slug to `segment_id`.
    pub const SEGMENT_SLUGS: &str = "segment_slugs";

    /// Unique index: segment name to `segment_id`.
    pub const SEGMENT_NAMES: &str = "segment_names";

    /// Membership records, keyed by `segment_id || user_id`.
    pub const MEMBERSHIPS: &str = "memberships";

    /// Index: memberships by user, keyed by `user_id || segment_id`.
    /// Value is empty (index only).
    pub const MEMBERSHIPS_BY_USER: &str = "memberships_by_user";

    /// Id sequences, keyed by sequence name. Values are raw big-endian `u64`.
    pub const SEQUENCES: &str = "sequences";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::USERS,
        cf::SEGMENTS,
        cf::SEGMENT_SLUGS,
        cf::SEGMENT_NAMES,
        cf::MEMBERSHIPS,
        cf::MEMBERSHIPS_BY_USER,
        cf::SEQUENCES,
    ]
}
