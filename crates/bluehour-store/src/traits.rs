//! Store trait definitions

use bluehour_api::{EntryFilter, MoodEntry, User};
use bluehour_util::{EntryId, UserId};
use chrono::{DateTime, NaiveDate, Utc};

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Users

    /// Create a user. Fails with `StoreError::Conflict` if the email is taken.
    fn create_user(&self, user: &UserRecord) -> StoreResult<()>;

    /// Look up a user by (already normalised) email
    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// Look up a user by ID
    fn find_user_by_id(&self, id: &UserId) -> StoreResult<Option<UserRecord>>;

    /// Number of registered users
    fn count_users(&self) -> StoreResult<usize>;

    // Sessions

    /// Persist a new login session
    fn create_session(&self, session: &SessionRecord) -> StoreResult<()>;

    /// Look up a session by token digest
    fn find_session(&self, token_digest: &str) -> StoreResult<Option<SessionRecord>>;

    /// Delete a session; returns whether it existed
    fn delete_session(&self, token_digest: &str) -> StoreResult<bool>;

    /// Delete every session that expired at or before `now`
    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize>;

    // Mood entries

    /// Insert a new entry owned by `user_id`
    fn insert_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<()>;

    /// Fetch an entry if it exists and belongs to `user_id`
    fn get_entry(&self, user_id: &UserId, id: &EntryId) -> StoreResult<Option<MoodEntry>>;

    /// Overwrite an entry owned by `user_id`; returns whether a row matched
    fn update_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<bool>;

    /// Delete an entry owned by `user_id`; returns whether a row matched
    fn delete_entry(&self, user_id: &UserId, id: &EntryId) -> StoreResult<bool>;

    /// All of a user's entries matching `filter`, newest first
    fn list_entries(&self, user_id: &UserId, filter: EntryFilter) -> StoreResult<Vec<MoodEntry>>;

    /// A user's entries dated within `from..=to`, newest first
    fn list_entries_between(
        &self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<MoodEntry>>;

    /// Insert or overwrite an entry by ID within `user_id`'s scope
    fn upsert_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<UpsertOutcome>;

    /// Total number of entries across all users
    fn count_entries(&self) -> StoreResult<usize>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Stored user, including credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Client-facing view without credentials
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            created_at: self.created_at,
        }
    }
}

/// Stored login session. Only a digest of the token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token_digest: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// What an upsert did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
    /// The ID belongs to another user's entry; nothing was written
    OwnedByOtherUser,
}
