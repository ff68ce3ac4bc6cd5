//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! It uses a pessimistic `TransactionDB`: keys read with `get_for_update` stay
//! locked until the transaction commits or rolls back.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode, MultiThreaded,
    Options, Transaction, TransactionDB, TransactionDBOptions,
};

use z_cohort_core::{
    Membership, NewSegment, Segment, SegmentId, SegmentPatch, Slug, User, UserId, UserPatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Store, StoreTxn};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: TransactionDB<MultiThreaded>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = TransactionDB::open_cf_descriptors(
            &opts,
            &TransactionDBOptions::default(),
            path,
            cf_descriptors,
        )
        .map_err(db_error)?;

        Ok(Self { db })
    }

    /// Verify that every column family is open and readable.
    ///
    /// # Errors
    ///
    /// Returns an error if a column family is missing or a read fails.
    pub fn check(&self) -> Result<()> {
        for name in all_column_families() {
            let cf = self.cf(name)?;
            self.db.get_cf(&cf, keys::USER_SEQUENCE).map_err(db_error)?;
        }
        Ok(())
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }
}

impl Store for RocksStore {
    type Txn<'a> = RocksTxn<'a>;

    fn begin(&self) -> Result<RocksTxn<'_>> {
        Ok(RocksTxn {
            store: self,
            txn: self.db.transaction(),
        })
    }
}

fn db_error(err: rocksdb::Error) -> StoreError {
    match err.kind() {
        ErrorKind::Busy | ErrorKind::TimedOut | ErrorKind::TryAgain => {
            StoreError::Busy(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

/// Serialize a value using CBOR.
fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

/// Deserialize a value from CBOR.
fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
}

/// A transaction on a [`RocksStore`].
///
/// Dropping the handle without committing discards its writes.
pub struct RocksTxn<'a> {
    store: &'a RocksStore,
    txn: Transaction<'a, TransactionDB<MultiThreaded>>,
}

impl<'a> RocksTxn<'a> {
    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.store.cf(cf_name)?;
        self.txn
            .get_cf(&cf, key)
            .map_err(db_error)?
            .map(|data| deserialize(&data))
            .transpose()
    }

    /// Read a key and lock it exclusively for the rest of the transaction.
    fn get_for_update(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.store.cf(cf_name)?;
        self.txn.get_for_update_cf(&cf, key, true).map_err(db_error)
    }

    fn put_raw(&self, cf_name: &str, key: &[u8], value: &[u8]) -> Result<()> {
        let cf = self.store.cf(cf_name)?;
        self.txn.put_cf(&cf, key, value).map_err(db_error)
    }

    fn put<T: serde::Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        self.put_raw(cf_name, key, &serialize(value)?)
    }

    fn delete(&self, cf_name: &str, key: &[u8]) -> Result<()> {
        let cf = self.store.cf(cf_name)?;
        self.txn.delete_cf(&cf, key).map_err(db_error)
    }

    /// Collect all entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.store.cf(cf_name)?;
        let iter = self
            .txn
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut entries = Vec::new();
        for item in iter {
            let (key, value) = item.map_err(db_error)?;

            if !key.starts_with(prefix) {
                break;
            }

            entries.push((key, value));
        }
        Ok(entries)
    }

    /// Advance a sequence and return the new value.
    fn next_id(&self, sequence: &[u8], entity: &'static str) -> Result<u64> {
        let next = self
            .current_sequence(sequence)?
            .checked_add(1)
            .ok_or(StoreError::SequenceExhausted { entity })?;
        self.put_raw(cf::SEQUENCES, sequence, &next.to_be_bytes())?;
        Ok(next)
    }

    /// Move a sequence forward so it never hands out `value` again.
    fn bump_sequence(&self, sequence: &[u8], value: u64) -> Result<()> {
        if self.current_sequence(sequence)? < value {
            self.put_raw(cf::SEQUENCES, sequence, &value.to_be_bytes())?;
        }
        Ok(())
    }

    fn current_sequence(&self, sequence: &[u8]) -> Result<u64> {
        self.get_for_update(cf::SEQUENCES, sequence)?
            .map_or(Ok(0), |raw| {
                raw.as_slice()
                    .try_into()
                    .map(u64::from_be_bytes)
                    .map_err(|_| StoreError::Serialization("corrupt sequence value".into()))
            })
    }

    /// Resolve a unique index entry to a segment.
    fn segment_from_index(&self, cf_name: &str, key: &[u8]) -> Result<Option<Segment>> {
        let cf = self.store.cf(cf_name)?;
        match self.txn.get_cf(&cf, key).map_err(db_error)? {
            Some(raw) => self.get_segment(SegmentId::from_be_slice(&raw)?),
            None => Ok(None),
        }
    }

    /// Lock a unique index key and fail if another segment holds it.
    fn claim_index(
        &self,
        cf_name: &str,
        key: &[u8],
        owner: SegmentId,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        if let Some(raw) = self.get_for_update(cf_name, key)? {
            if SegmentId::from_be_slice(&raw)? != owner {
                return Err(StoreError::AlreadyExists {
                    entity: "segment",
                    field,
                    value: value.to_string(),
                });
            }
        }
        self.put_raw(cf_name, key, &owner.to_be_bytes())
    }

    fn delete_membership_keys(&self, user_id: UserId, segment_id: SegmentId) -> Result<()> {
        self.delete(cf::MEMBERSHIPS, &keys::membership_key(segment_id, user_id))?;
        self.delete(
            cf::MEMBERSHIPS_BY_USER,
            &keys::user_membership_key(user_id, segment_id),
        )
    }
}

impl<'a> StoreTxn for RocksTxn<'a> {
    fn commit(self) -> Result<()> {
        self.txn.commit().map_err(db_error)
    }

    fn rollback(&self) -> Result<()> {
        self.txn.rollback().map_err(db_error)
    }

    // =========================================================================
    // User Operations
    // =========================================================================

    fn create_user(&self, id: Option<UserId>, name: String) -> Result<User> {
        let id = match id {
            Some(id) => {
                if self.get_for_update(cf::USERS, &keys::user_key(id))?.is_some() {
                    return Err(StoreError::AlreadyExists {
                        entity: "user",
                        field: "id",
                        value: id.to_string(),
                    });
                }
                self.bump_sequence(keys::USER_SEQUENCE, id.get())?;
                id
            }
            None => {
                let id = UserId::new(self.next_id(keys::USER_SEQUENCE, "user")?);
                if self.get_for_update(cf::USERS, &keys::user_key(id))?.is_some() {
                    return Err(StoreError::AlreadyExists {
                        entity: "user",
                        field: "id",
                        value: id.to_string(),
                    });
                }
                id
            }
        };

        let user = User::new(id, name)?;
        self.put(cf::USERS, &keys::user_key(id), &user)?;

        tracing::debug!(user_id = %id, "User created");
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.get(cf::USERS, &keys::user_key(id))
    }

    fn list_users(&self, active_only: bool) -> Result<Vec<User>> {
        let mut users = Vec::new();
        for (_, value) in self.scan_prefix(cf::USERS, &[])? {
            let user: User = deserialize(&value)?;
            if user.active || !active_only {
                users.push(user);
            }
        }
        Ok(users)
    }

    fn update_user(&self, id: UserId, patch: UserPatch) -> Result<User> {
        let key = keys::user_key(id);
        let raw = self
            .get_for_update(cf::USERS, &key)?
            .ok_or_else(|| StoreError::not_found("user", id))?;

        let mut user: User = deserialize(&raw)?;
        user.apply(patch)?;
        self.put(cf::USERS, &key, &user)?;

        Ok(user)
    }

    fn delete_user(&self, id: UserId) -> Result<usize> {
        let key = keys::user_key(id);
        if self.get_for_update(cf::USERS, &key)?.is_none() {
            return Err(StoreError::not_found("user", id));
        }

        let index = self.scan_prefix(
            cf::MEMBERSHIPS_BY_USER,
            &keys::user_memberships_prefix(id),
        )?;
        for (index_key, _) in &index {
            let segment_id = keys::extract_segment_id_from_user_key(index_key)?;
            self.delete_membership_keys(id, segment_id)?;
        }

        self.delete(cf::USERS, &key)?;

        tracing::debug!(user_id = %id, memberships_removed = index.len(), "User deleted");
        Ok(index.len())
    }

    // =========================================================================
    // Segment Operations
    // =========================================================================

    fn create_segment(&self, input: NewSegment) -> Result<Segment> {
        let input = input.validated()?;

        let slug_key = keys::slug_key(&input.slug);
        if self.get_for_update(cf::SEGMENT_SLUGS, &slug_key)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "segment",
                field: "slug",
                value: input.slug.to_string(),
            });
        }
        let name_key = keys::segment_name_key(&input.name);
        if self.get_for_update(cf::SEGMENT_NAMES, &name_key)?.is_some() {
            return Err(StoreError::AlreadyExists {
                entity: "segment",
                field: "name",
                value: input.name,
            });
        }

        let id = SegmentId::new(self.next_id(keys::SEGMENT_SEQUENCE, "segment")?);
        let segment = Segment::new(id, input);

        self.put(cf::SEGMENTS, &keys::segment_key(id), &segment)?;
        self.put_raw(cf::SEGMENT_SLUGS, &slug_key, &id.to_be_bytes())?;
        self.put_raw(cf::SEGMENT_NAMES, &name_key, &id.to_be_bytes())?;

        tracing::debug!(segment_id = %id, slug = %segment.slug, "Segment created");
        Ok(segment)
    }

    fn get_segment(&self, id: SegmentId) -> Result<Option<Segment>> {
        self.get(cf::SEGMENTS, &keys::segment_key(id))
    }

    fn lock_segment(&self, id: SegmentId) -> Result<Segment> {
        let raw = self
            .get_for_update(cf::SEGMENTS, &keys::segment_key(id))?
            .ok_or_else(|| StoreError::not_found("segment", id))?;
        deserialize(&raw)
    }

    fn get_segment_by_slug(&self, slug: &Slug) -> Result<Option<Segment>> {
        self.segment_from_index(cf::SEGMENT_SLUGS, &keys::slug_key(slug))
    }

    fn list_segments(&self) -> Result<Vec<Segment>> {
        self.scan_prefix(cf::SEGMENTS, &[])?
            .iter()
            .map(|(_, value)| deserialize(value))
            .collect()
    }

    fn update_segment(&self, id: SegmentId, patch: SegmentPatch) -> Result<Segment> {
        let mut segment = self.lock_segment(id)?;
        let old_name = segment.name.clone();
        segment.apply(patch)?;

        if segment.name != old_name {
            self.claim_index(
                cf::SEGMENT_NAMES,
                &keys::segment_name_key(&segment.name),
                id,
                "name",
                &segment.name,
            )?;
            self.delete(cf::SEGMENT_NAMES, &keys::segment_name_key(&old_name))?;
        }

        self.put(cf::SEGMENTS, &keys::segment_key(id), &segment)?;
        Ok(segment)
    }

    fn delete_segment(&self, id: SegmentId) -> Result<usize> {
        let segment = self.lock_segment(id)?;
        let removed = self.delete_memberships_for_segment(id)?;

        self.delete(cf::SEGMENT_SLUGS, &keys::slug_key(&segment.slug))?;
        self.delete(cf::SEGMENT_NAMES, &keys::segment_name_key(&segment.name))?;
        self.delete(cf::SEGMENTS, &keys::segment_key(id))?;

        tracing::debug!(segment_id = %id, memberships_removed = removed, "Segment deleted");
        Ok(removed)
    }

    // =========================================================================
    // Membership Operations
    // =========================================================================

    fn membership_exists(&self, user_id: UserId, segment_id: SegmentId) -> Result<bool> {
        let cf = self.store.cf(cf::MEMBERSHIPS)?;
        let exists = self
            .txn
            .get_cf(&cf, keys::membership_key(segment_id, user_id))
            .map_err(db_error)?
            .is_some();
        Ok(exists)
    }

    fn list_memberships(&self, segment_id: SegmentId) -> Result<Vec<Membership>> {
        self.scan_prefix(
            cf::MEMBERSHIPS,
            &keys::segment_memberships_prefix(segment_id),
        )?
        .iter()
        .map(|(_, value)| deserialize(value))
        .collect()
    }

    fn list_user_memberships(&self, user_id: UserId) -> Result<Vec<Membership>> {
        let index = self.scan_prefix(
            cf::MEMBERSHIPS_BY_USER,
            &keys::user_memberships_prefix(user_id),
        )?;

        let mut memberships = Vec::with_capacity(index.len());
        for (index_key, _) in &index {
            let segment_id = keys::extract_segment_id_from_user_key(index_key)?;
            if let Some(membership) =
                self.get(cf::MEMBERSHIPS, &keys::membership_key(segment_id, user_id))?
            {
                memberships.push(membership);
            }
        }
        Ok(memberships)
    }

    fn create_membership(&self, user_id: UserId, segment_id: SegmentId) -> Result<Membership> {
        // Lock both rows until commit
        if self.get_for_update(cf::USERS, &keys::user_key(user_id))?.is_none() {
            return Err(StoreError::not_found("user", user_id));
        }
        if self.get_for_update(cf::SEGMENTS, &keys::segment_key(segment_id))?.is_none() {
            return Err(StoreError::not_found("segment", segment_id));
        }

        let key = keys::membership_key(segment_id, user_id);
        if self.get_for_update(cf::MEMBERSHIPS, &key)?.is_some() {
            return Err(StoreError::Conflict {
                user_id,
                segment_id,
            });
        }

        let membership = Membership::new(user_id, segment_id);
        self.put(cf::MEMBERSHIPS, &key, &membership)?;
        self.put_raw(
            cf::MEMBERSHIPS_BY_USER,
            &keys::user_membership_key(user_id, segment_id),
            &[],
        )?;

        Ok(membership)
    }

    fn delete_membership(&self, user_id: UserId, segment_id: SegmentId) -> Result<()> {
        let key = keys::membership_key(segment_id, user_id);
        if self.get_for_update(cf::MEMBERSHIPS, &key)?.is_none() {
            return Err(StoreError::not_found(
                "membership",
                format!("user {user_id} in segment {segment_id}"),
            ));
        }
        self.delete_membership_keys(user_id, segment_id)
    }

    fn delete_memberships_for_segment(&self, segment_id: SegmentId) -> Result<usize> {
        let entries = self.scan_prefix(
            cf::MEMBERSHIPS,
            &keys::segment_memberships_prefix(segment_id),
        )?;
        for (key, _) in &entries {
            let user_id = keys::extract_user_id_from_membership_key(key)?;
            self.delete_membership_keys(user_id, segment_id)?;
        }
        Ok(entries.len())
    }
}
