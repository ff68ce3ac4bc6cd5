//! Distribution handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use z_cohort_core::{DistributionReport, DistributionRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Randomly assign a percentage of users to a segment.
///
/// Runs in a single transaction with the segment locked, so concurrent
/// distributions to the same segment are serialized.
pub async fn distribute(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DistributionRequest>,
) -> Result<Json<DistributionReport>, ApiError> {
    let report = state.distribute(request).await?;

    Ok(Json(report))
}
