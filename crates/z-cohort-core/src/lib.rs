//! Core types and utilities for z-cohort.
//!
//! This crate provides the foundational types used throughout the z-cohort service:
//!
//! - **Identifiers**: `UserId`, `SegmentId`
//! - **Users**: `User`, `UserPatch`
//! - **Segments**: `Segment`, `NewSegment`, `SegmentPatch`, `Slug`
//! - **Memberships**: `Membership`, `UserStats`
//! - **Distribution**: `Percent`, `DistributionRequest`, `DistributionReport`
//!
//! # Distribution Arithmetic
//!
//! A distribution assigns `floor(eligible * percent / 100)` users to a segment.
//! The count is truncated, never rounded: 33% of 10 users is 3 users.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod distribution;
pub mod error;
pub mod ids;
pub mod membership;
pub mod segment;
pub mod user;

pub use distribution::{
    achieved_percent, sample_indices, target_count, DistributionReport, DistributionRequest,
    Percent, UserOutcome, NO_USERS_MESSAGE,
};
pub use error::{CohortError, Result};
pub use ids::{IdError, SegmentId, UserId};
pub use membership::{Membership, UserStats};
pub use segment::{
    NewSegment, Segment, SegmentPatch, Slug, DESCRIPTION_MAX_LEN, SEGMENT_NAME_MAX_LEN,
    SLUG_MAX_LEN,
};
pub use user::{User, UserPatch, USER_NAME_MAX_LEN};
