//! Identifier types for z-cohort.
//!
//! Users and segments are keyed by unsigned integers. User IDs may be supplied
//! by the caller; segment IDs are always allocated by the store.
//!
//! # Macro-based ID Types
//!
//! The `int_id_type!` macro keeps serialization, parsing and key encoding
//! identical across identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Macro to define an integer identifier type with standard trait implementations.
///
/// This macro generates a newtype wrapper around `u64` with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `PartialOrd`, `Ord`, `Hash`
/// - `Serialize`, `Deserialize` (as a plain integer)
/// - `FromStr`, `Display`, `Debug`
/// - `From<u64>`, `Into<u64>`
/// - big-endian byte encoding for ordered storage keys
///
/// # Example
///
/// ```ignore
/// int_id_type!(MyId, "A custom identifier type.");
/// let id = MyId::new(7);
/// let parsed: MyId = id.to_string().parse().unwrap();
/// ```
macro_rules! int_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            /// Create an identifier from its integer value.
            #[must_use]
            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            /// Return the integer value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// Big-endian encoding, so byte order matches numeric order.
            #[must_use]
            pub const fn to_be_bytes(self) -> [u8; 8] {
                self.0.to_be_bytes()
            }

            /// Decode an identifier from the first 8 bytes of a key.
            ///
            /// # Errors
            ///
            /// Returns `IdError::InvalidLength` if fewer than 8 bytes are given.
            pub fn from_be_slice(bytes: &[u8]) -> Result<Self, IdError> {
                let raw: [u8; 8] = bytes
                    .get(..8)
                    .and_then(|b| b.try_into().ok())
                    .ok_or(IdError::InvalidLength {
                        expected: 8,
                        actual: bytes.len(),
                    })?;
                Ok(Self(u64::from_be_bytes(raw)))
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.parse::<u64>().map_err(|_| IdError::InvalidInteger)?;
                Ok(Self(value))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

int_id_type!(UserId, "A user identifier.\n\nEither supplied by the caller on creation or allocated from the store's user sequence.");
int_id_type!(SegmentId, "A segment identifier.\n\nAllocated from the store's segment sequence. The segment slug is the stable external alias.");

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not an unsigned integer.
    #[error("invalid integer identifier")]
    InvalidInteger,

    /// A stored key is too short to hold an identifier.
    #[error("invalid key length: expected at least {expected} bytes, got {actual}")]
    InvalidLength {
        /// Minimum number of bytes.
        expected: usize,
        /// Number of bytes present.
        actual: usize,
    },
}
