//! Core journal logic for bluehour
//!
//! This crate provides:
//! - The reflection aggregator (N-day report)
//! - Request validation
//! - Password hashing and session tokens
//! - [`JournalService`], the business operations behind the HTTP API

mod password;
mod report;
mod service;
mod session;
mod validation;

pub use password::*;
pub use report::*;
pub use service::*;
pub use session::*;
pub use validation::*;

use bluehour_store::StoreError;
use thiserror::Error;

/// Errors surfaced by journal operations
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{message}")]
    Validation {
        message: String,
        details: FieldErrors,
    },

    #[error("Email already registered. Please login instead.")]
    EmailTaken,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Entry not found")]
    EntryNotFound,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

pub type CoreResult<T> = Result<T, CoreError>;
