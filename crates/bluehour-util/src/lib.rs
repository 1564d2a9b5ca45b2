//! Shared utilities for bluehour
//!
//! This crate provides:
//! - ID types (UserId, EntryId)
//! - Time utilities (wall clock with mock support, monotonic time, calendar days)
//! - The request admission guard used for abuse mitigation
//! - Default paths for config and data directories

mod ids;
mod paths;
mod rate_limit;
mod time;

pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
