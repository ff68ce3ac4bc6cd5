//! Distribution arithmetic and report types.
//!
//! The store-side engine lives in `z_cohort_store::distribution`; this module
//! holds the pure parts so they can be tested without a database.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CohortError, Result};
use crate::{SegmentId, UserId};

/// Report message when the candidate population is empty.
pub const NO_USERS_MESSAGE: &str = "No users available for distribution";

/// A percentage in the closed range `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Percent(f64);

impl Percent {
    /// Validate a percentage.
    ///
    /// Out-of-range values are rejected rather than clamped.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::InvalidPercent` for values outside `[0, 100]` and NaN.
    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=100.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(CohortError::InvalidPercent(value))
        }
    }

    /// The raw value.
    #[must_use]
    pub const fn get(self) -> f64 {
        self.0
    }
}

/// Number of users to draw: `floor(eligible * percent / 100)`.
///
/// Truncates, so a percent that does not divide evenly yields the smaller
/// count. Never exceeds `eligible`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn target_count(eligible: usize, percent: Percent) -> usize {
    let exact = eligible as f64 * percent.get() / 100.0;
    (exact.floor() as usize).min(eligible)
}

/// Draw `amount` distinct indices from `0..population`, uniformly without
/// replacement. The result is sorted ascending.
///
/// `amount` is capped at `population`.
#[must_use]
pub fn sample_indices<R: Rng + ?Sized>(rng: &mut R, population: usize, amount: usize) -> Vec<usize> {
    let amount = amount.min(population);
    if amount == 0 {
        return Vec::new();
    }
    let mut indices = rand::seq::index::sample(rng, population, amount).into_vec();
    indices.sort_unstable();
    indices
}

/// Share of `total` that are members, in percent, rounded to two decimals.
/// Zero when `total` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn achieved_percent(members: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = members as f64 / total as f64 * 100.0;
    (percent * 100.0).round() / 100.0
}

/// Request to distribute a segment over a share of the user population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRequest {
    /// Target segment.
    pub segment_id: SegmentId,
    /// Share of eligible users to assign, `[0, 100]`.
    pub percent: f64,
    /// Clear existing memberships first and re-draw from the full population.
    #[serde(default)]
    pub overwrite_existing: bool,
    /// Only consider active users.
    #[serde(default = "default_active_only")]
    pub active_only: bool,
}

const fn default_active_only() -> bool {
    true
}

impl DistributionRequest {
    /// Request with default flags: keep existing members, active users only.
    #[must_use]
    pub const fn new(segment_id: SegmentId, percent: f64) -> Self {
        Self {
            segment_id,
            percent,
            overwrite_existing: false,
            active_only: true,
        }
    }

    /// Set overwrite mode.
    #[must_use]
    pub const fn overwrite(mut self, overwrite_existing: bool) -> Self {
        self.overwrite_existing = overwrite_existing;
        self
    }

    /// Set the active-only filter.
    #[must_use]
    pub const fn active_only(mut self, active_only: bool) -> Self {
        self.active_only = active_only;
        self
    }
}

/// Outcome of a distribution for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOutcome {
    /// The user ID.
    pub user_id: UserId,
    /// The user's name.
    pub user_name: String,
    /// Assigned by this distribution.
    pub assigned: bool,
    /// Was already a member before this distribution.
    pub already_assigned: bool,
}

/// Result of a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    /// Target segment.
    pub segment_id: SegmentId,
    /// Target segment name.
    pub segment_name: String,
    /// Human-readable summary.
    pub message: String,
    /// Percent from the request.
    pub requested_percent: f64,
    /// `(newly_assigned + already_assigned) / total_users * 100`.
    pub actual_percent: f64,
    /// Size of the candidate population.
    pub total_users: usize,
    /// Candidates not already in the segment.
    pub eligible_users: usize,
    /// Memberships created by this distribution.
    pub newly_assigned: usize,
    /// Members before this distribution that kept their membership, whether or
    /// not they are in the candidate population.
    pub already_assigned: usize,
    /// Members of the segment after the distribution, ordered by user ID.
    pub users: Vec<UserOutcome>,
}

impl DistributionReport {
    /// Report for an empty candidate population.
    #[must_use]
    pub fn empty(segment_id: SegmentId, segment_name: String, requested_percent: f64) -> Self {
        Self {
            segment_id,
            segment_name,
            message: NO_USERS_MESSAGE.to_string(),
            requested_percent,
            actual_percent: 0.0,
            total_users: 0,
            eligible_users: 0,
            newly_assigned: 0,
            already_assigned: 0,
            users: Vec::new(),
        }
    }
}
