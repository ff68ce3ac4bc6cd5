//! Z-Cohort Client SDK.
//!
//! This crate provides a client library for services to interact with the z-cohort API.
//!
//! # Example
//!
//! ```no_run
//! use z_cohort_client::{CohortClient, CreateSegmentRequest, CreateUserRequest};
//! use z_cohort_core::{DistributionRequest, SegmentId};
//!
//! # async fn example() -> Result<(), z_cohort_client::ClientError> {
//! let client = CohortClient::new("http://z-cohort.cohort-system.svc:8080")?;
//!
//! client.create_user(CreateUserRequest::new("Ada")).await?;
//! let segment = client
//!     .create_segment(CreateSegmentRequest::new("Beta testers", "BETA"))
//!     .await?;
//!
//! // Put a quarter of the active users into the segment
//! let report = client
//!     .distribute(&DistributionRequest::new(SegmentId::new(segment.id), 25.0))
//!     .await?;
//!
//! println!("{} users assigned", report.newly_assigned);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, CohortClient};
pub use error::ClientError;
pub use types::*;
