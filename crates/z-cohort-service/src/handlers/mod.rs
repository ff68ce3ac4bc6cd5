//! API handlers.

pub mod distribution;
pub mod health;
pub mod segments;
pub mod users;
