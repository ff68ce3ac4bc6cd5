//! `RocksDB` storage layer for z-cohort.
//!
//! This crate provides persistent storage for users, segments and memberships
//! using a `RocksDB` transaction database with column families for indexing,
//! plus the distribution engine that runs on top of it.
//!
//! # Architecture
//!
//! The storage uses the following column families:
//!
//! - `users`: User records, keyed by `user_id`
//! - `segments`: Segment records, keyed by `segment_id`
//! - `segment_slugs` / `segment_names`: unique indexes onto `segment_id`
//! - `memberships`: Membership records, keyed by `segment_id || user_id`
//! - `memberships_by_user`: Index for listing a user's memberships
//! - `sequences`: id allocation
//!
//! Every operation runs inside a [`StoreTxn`]. Deleting a user or a segment
//! deletes its memberships in the same transaction.
//!
//! # Example
//!
//! ```no_run
//! use z_cohort_store::{RocksStore, Store, StoreError, StoreTxn};
//! use z_cohort_core::NewSegment;
//!
//! let store = RocksStore::open("/tmp/z-cohort-db").unwrap();
//!
//! let segment = store
//!     .transaction(|txn| -> Result<_, StoreError> {
//!         let user = txn.create_user(None, "Ada".into())?;
//!         let segment = txn.create_segment(NewSegment::new("Beta", "BETA", None)?)?;
//!         txn.create_membership(user.id, segment.id)?;
//!         Ok(segment)
//!     })
//!     .unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod distribution;
pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use distribution::distribute;
pub use error::{Result, StoreError};
pub use rocks::{RocksStore, RocksTxn};

use z_cohort_core::{
    Membership, NewSegment, Segment, SegmentId, SegmentPatch, Slug, User, UserId, UserPatch,
};

/// The storage trait: a source of transactions.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    /// Transaction handle borrowed from the store.
    type Txn<'a>: StoreTxn
    where
        Self: 'a;

    /// Begin a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot start a transaction.
    fn begin(&self) -> Result<Self::Txn<'_>>;

    /// Run `f` inside a transaction. Commits on `Ok`, rolls back on `Err`.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or a storage error if begin/commit fails.
    fn transaction<'s, T, E, F>(&'s self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Self::Txn<'s>) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        let txn = self.begin()?;
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = txn.rollback() {
                    tracing::warn!(error = %rollback_err, "Transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Operations available inside a transaction.
///
/// Reads see the transaction's own uncommitted writes. Nothing is visible to
/// other transactions until [`StoreTxn::commit`].
pub trait StoreTxn {
    /// Commit all writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails; no writes are applied in that case.
    fn commit(self) -> Result<()>
    where
        Self: Sized;

    /// Discard all writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the database rejects the rollback.
    fn rollback(&self) -> Result<()>;

    // =========================================================================
    // User Operations
    // =========================================================================

    /// Create a user. Allocates an id when `id` is `None`.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyExists` if a supplied id is taken.
    /// - `StoreError::InvalidArgument` if the name is invalid.
    fn create_user(&self, id: Option<UserId>, name: String) -> Result<User>;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// List users ordered by ID, optionally only active ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_users(&self, active_only: bool) -> Result<Vec<User>>;

    /// Apply a partial update to a user.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user doesn't exist.
    /// - `StoreError::InvalidArgument` if the new name is invalid.
    fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User>;

    /// Delete a user and all of its memberships.
    ///
    /// Returns the number of memberships removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    fn delete_user(&self, id: UserId) -> Result<usize>;

    // =========================================================================
    // Segment Operations
    // =========================================================================

    /// Create a segment with a freshly allocated id.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyExists` if the slug or name is taken.
    /// - `StoreError::InvalidArgument` if the input is invalid.
    fn create_segment(&self, input: NewSegment) -> Result<Segment>;

    /// Get a segment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_segment(&self, id: SegmentId) -> Result<Option<Segment>>;

    /// Get a segment and hold an exclusive lock on it until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the segment doesn't exist.
    fn lock_segment(&self, id: SegmentId) -> Result<Segment>;

    /// Get a segment by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_segment_by_slug(&self, slug: &Slug) -> Result<Option<Segment>>;

    /// List segments ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_segments(&self) -> Result<Vec<Segment>>;

    /// Apply a partial update to a segment.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the segment doesn't exist.
    /// - `StoreError::AlreadyExists` if the new name is taken.
    /// - `StoreError::InvalidArgument` if the patch is invalid.
    fn update_segment(&self, id: SegmentId, patch: SegmentPatch) -> Result<Segment>;

    /// Delete a segment and all of its memberships.
    ///
    /// Returns the number of memberships removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the segment doesn't exist.
    fn delete_segment(&self, id: SegmentId) -> Result<usize>;

    // =========================================================================
    // Membership Operations
    // =========================================================================

    /// Check whether a user is a member of a segment.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn membership_exists(&self, user_id: UserId, segment_id: SegmentId) -> Result<bool>;

    /// List memberships of a segment ordered by user ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_memberships(&self, segment_id: SegmentId) -> Result<Vec<Membership>>;

    /// List memberships of a user ordered by segment ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_user_memberships(&self, user_id: UserId) -> Result<Vec<Membership>>;

    /// Assign a user to a segment.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the user or segment doesn't exist.
    /// - `StoreError::Conflict` if the membership already exists.
    fn create_membership(&self, user_id: UserId, segment_id: SegmentId) -> Result<Membership>;

    /// Remove a user from a segment.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the membership doesn't exist.
    fn delete_membership(&self, user_id: UserId, segment_id: SegmentId) -> Result<()>;

    /// Remove every membership of a segment.
    ///
    /// Returns the number of memberships removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn delete_memberships_for_segment(&self, segment_id: SegmentId) -> Result<usize>;
}
