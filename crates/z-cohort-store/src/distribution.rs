//! Randomized segment distribution.
//!
//! Assigns a share of the user population to a segment inside a single
//! transaction. The segment row stays locked for the whole call, so two
//! distributions on the same segment run one after the other.

use std::collections::{HashMap, HashSet};

use rand::Rng;

use z_cohort_core::{
    achieved_percent, sample_indices, target_count, DistributionReport, DistributionRequest,
    Percent, User, UserId, UserOutcome,
};

use crate::error::{Result, StoreError};
use crate::StoreTxn;

/// Distribute a segment over `request.percent` of the eligible users.
///
/// Without overwrite, current members keep their membership and are excluded
/// from the draw. With overwrite, the segment is emptied first and the draw
/// covers the whole population. A membership that turns out to exist already
/// when it is created is counted as already assigned instead of failing the
/// call.
///
/// `already_assigned` counts every membership the segment had at call time,
/// including members filtered out by `active_only`, so `actual_percent` can
/// exceed 100.
///
/// # Errors
///
/// - `StoreError::NotFound` if the segment doesn't exist (nothing is changed).
/// - `StoreError::InvalidArgument` if the percent is outside `[0, 100]`.
/// - Any storage error; the caller's transaction should then be rolled back.
pub fn distribute<T, R>(
    txn: &T,
    rng: &mut R,
    request: &DistributionRequest,
) -> Result<DistributionReport>
where
    T: StoreTxn + ?Sized,
    R: Rng + ?Sized,
{
    let segment = txn.lock_segment(request.segment_id)?;
    let percent = Percent::new(request.percent)?;

    let population = txn.list_users(request.active_only)?;
    if population.is_empty() {
        tracing::info!(segment_id = %segment.id, "No users available for distribution");
        return Ok(DistributionReport::empty(
            segment.id,
            segment.name,
            percent.get(),
        ));
    }

    let mut already: HashSet<UserId> = if request.overwrite_existing {
        let removed = txn.delete_memberships_for_segment(segment.id)?;
        tracing::debug!(segment_id = %segment.id, removed, "Cleared segment before re-roll");
        HashSet::new()
    } else {
        txn.list_memberships(segment.id)?
            .into_iter()
            .map(|m| m.user_id)
            .collect()
    };

    let eligible: Vec<&User> = population
        .iter()
        .filter(|user| !already.contains(&user.id))
        .collect();
    let target = target_count(eligible.len(), percent);

    let mut newly: HashSet<UserId> = HashSet::with_capacity(target);
    for index in sample_indices(rng, eligible.len(), target) {
        let user = eligible[index];
        match txn.create_membership(user.id, segment.id) {
            Ok(_) => {
                newly.insert(user.id);
            }
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!(
                    user_id = %user.id,
                    segment_id = %segment.id,
                    "Membership already exists, skipping"
                );
                already.insert(user.id);
            }
            Err(err) => return Err(err),
        }
    }

    let names: HashMap<UserId, &str> = population
        .iter()
        .map(|user| (user.id, user.name.as_str()))
        .collect();
    let mut member_ids: Vec<UserId> = newly.union(&already).copied().collect();
    member_ids.sort_unstable();

    // Members outside the candidate population still count as already assigned
    let mut users = Vec::with_capacity(member_ids.len());
    for user_id in member_ids {
        let user_name = match names.get(&user_id) {
            Some(name) => (*name).to_string(),
            None => txn
                .get_user(user_id)?
                .map(|user| user.name)
                .unwrap_or_default(),
        };
        users.push(UserOutcome {
            user_id,
            user_name,
            assigned: newly.contains(&user_id),
            already_assigned: already.contains(&user_id),
        });
    }

    let newly_assigned = newly.len();
    let already_assigned = already.len();

    tracing::info!(
        segment_id = %segment.id,
        slug = %segment.slug,
        requested_percent = percent.get(),
        total_users = population.len(),
        eligible_users = eligible.len(),
        newly_assigned,
        already_assigned,
        "Segment distributed"
    );

    Ok(DistributionReport {
        segment_id: segment.id,
        message: format!(
            "Segment '{}' distributed to {newly_assigned} users",
            segment.slug
        ),
        segment_name: segment.name,
        requested_percent: percent.get(),
        actual_percent: achieved_percent(newly_assigned + already_assigned, population.len()),
        total_users: population.len(),
        eligible_users: eligible.len(),
        newly_assigned,
        already_assigned,
        users,
    })
}
