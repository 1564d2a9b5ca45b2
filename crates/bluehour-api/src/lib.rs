//! Domain and wire types for bluehour
//!
//! This crate defines the types shared between the service and its clients:
//! - Mood entries, scales, filters and users
//! - Report summary and day-by-day series
//! - Request and response bodies of the JSON API
//! - Display helpers for report values

mod display;
mod report;
mod requests;
mod types;

pub use display::*;
pub use report::*;
pub use requests::*;
pub use types::*;

/// Current API version
pub const API_VERSION: u32 = 1;
