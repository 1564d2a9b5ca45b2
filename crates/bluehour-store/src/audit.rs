//! Audit event types

use bluehour_util::{EntryId, UserId};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// Service started
    ServiceStarted,

    /// Service stopped
    ServiceStopped,

    /// New account created
    UserSignedUp { user_id: UserId },

    /// Successful login
    LoginSucceeded { user_id: UserId },

    /// Failed login (unknown email or wrong password)
    LoginFailed { email: String },

    /// Session ended by the user
    LoggedOut { user_id: UserId },

    /// Check-in saved
    EntryCreated { user_id: UserId, entry_id: EntryId },

    /// Check-in edited
    EntryUpdated { user_id: UserId, entry_id: EntryId },

    /// Check-in deleted
    EntryDeleted { user_id: UserId, entry_id: EntryId },

    /// Entries exported
    EntriesExported { user_id: UserId, count: usize },

    /// Entries imported
    EntriesImported {
        user_id: UserId,
        imported: usize,
        skipped: usize,
    },

    /// Request refused by the admission guard
    RateLimited { key: String },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp: bluehour_util::now(),
            event,
        }
    }
}
