//! SQLite-based store implementation

use bluehour_api::{
    EntryFilter, HIGH_ANXIETY_THRESHOLD, LOW_MOOD_THRESHOLD, MoodEntry, Scale,
};
use bluehour_util::{EntryId, UserId, format_calendar_date, parse_calendar_date};
use chrono::{DateTime, Local, NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::migrations::migrate;
use crate::{
    AuditEvent, SessionRecord, Store, StoreError, StoreResult, UpsertOutcome, UserRecord,
};

const ENTRY_COLUMNS: &str = "id, created_at, person_name, entry_date, entry_time_label, \
     mood, anxiety, energy, notes, triggers_json, helped_json, felt_safe";

const ENTRY_ORDER: &str = "ORDER BY entry_date DESC, created_at DESC";

/// SQLite-based store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let mut conn = Connection::open(path)?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let mut conn = Connection::open_in_memory()?;
        migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn query_entries(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> StoreResult<Vec<MoodEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, EntryRow::from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }
}

impl Store for SqliteStore {
    fn append_audit(&self, mut event: AuditEvent) -> StoreResult<()> {
        let conn = self.conn()?;
        let event_json = serde_json::to_string(&event.event)?;

        conn.execute(
            "INSERT INTO audit_log (timestamp, event_json) VALUES (?, ?)",
            params![event.timestamp.to_rfc3339(), event_json],
        )?;

        event.id = conn.last_insert_rowid();
        debug!(event_id = event.id, "Audit event appended");

        Ok(())
    }

    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp, event_json FROM audit_log ORDER BY id DESC LIMIT ?",
        )?;

        let rows = stmt.query_map([limit as i64], |row| {
            let id: i64 = row.get(0)?;
            let timestamp_str: String = row.get(1)?;
            let event_json: String = row.get(2)?;
            Ok((id, timestamp_str, event_json))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (id, timestamp_str, event_json) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
                .map(|dt| dt.with_timezone(&Local))
                .unwrap_or_else(|_| bluehour_util::now());
            let event: crate::AuditEventType = serde_json::from_str(&event_json)?;

            events.push(AuditEvent {
                id,
                timestamp,
                event,
            });
        }

        Ok(events)
    }

    fn create_user(&self, user: &UserRecord) -> StoreResult<()> {
        let conn = self.conn()?;

        let result = conn.execute(
            "INSERT INTO users (id, email, password_hash, full_name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                user.id.to_string(),
                user.email,
                user.password_hash,
                user.full_name,
                timestamp(user.created_at),
                timestamp(user.updated_at),
            ],
        );

        match result {
            Ok(_) => {
                debug!(user_id = %user.id, "User created");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::Conflict("email already registered".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, email, password_hash, full_name, created_at, updated_at
                 FROM users WHERE email = ?",
                [email],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_record).transpose()
    }

    fn find_user_by_id(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, email, password_hash, full_name, created_at, updated_at
                 FROM users WHERE id = ?",
                [id.to_string()],
                UserRow::from_row,
            )
            .optional()?;
        row.map(UserRow::into_record).transpose()
    }

    fn count_users(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn create_session(&self, session: &SessionRecord) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (token_digest, user_id, created_at, expires_at)
             VALUES (?, ?, ?, ?)",
            params![
                session.token_digest,
                session.user_id.to_string(),
                timestamp(session.created_at),
                timestamp(session.expires_at),
            ],
        )?;
        debug!(user_id = %session.user_id, "Session created");
        Ok(())
    }

    fn find_session(&self, token_digest: &str) -> StoreResult<Option<SessionRecord>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT token_digest, user_id, created_at, expires_at
                 FROM sessions WHERE token_digest = ?",
                [token_digest],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(token_digest, user_id, created_at, expires_at)| {
            Ok(SessionRecord {
                token_digest,
                user_id: parse_id(&user_id)?,
                created_at: parse_timestamp(&created_at)?,
                expires_at: parse_timestamp(&expires_at)?,
            })
        })
        .transpose()
    }

    fn delete_session(&self, token_digest: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM sessions WHERE token_digest = ?", [token_digest])?;
        Ok(deleted > 0)
    }

    fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?",
            [timestamp(now)],
        )?;
        if deleted > 0 {
            debug!(count = deleted, "Expired sessions removed");
        }
        Ok(deleted)
    }

    fn insert_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<()> {
        let conn = self.conn()?;
        insert_entry_row(&conn, user_id, entry)
    }

    fn get_entry(&self, user_id: &UserId, id: &EntryId) -> StoreResult<Option<MoodEntry>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM mood_entries WHERE id = ? AND user_id = ?"),
                params![id.to_string(), user_id.to_string()],
                EntryRow::from_row,
            )
            .optional()?;
        row.map(EntryRow::into_entry).transpose()
    }

    fn update_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<bool> {
        let conn = self.conn()?;
        Ok(update_entry_row(&conn, user_id, entry)? > 0)
    }

    fn delete_entry(&self, user_id: &UserId, id: &EntryId) -> StoreResult<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM mood_entries WHERE id = ? AND user_id = ?",
            params![id.to_string(), user_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    fn list_entries(&self, user_id: &UserId, filter: EntryFilter) -> StoreResult<Vec<MoodEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM mood_entries WHERE user_id = ?{} {ENTRY_ORDER}",
            filter_clause(filter)
        );
        self.query_entries(&sql, [user_id.to_string()])
    }

    fn list_entries_between(
        &self,
        user_id: &UserId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<MoodEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM mood_entries
             WHERE user_id = ? AND entry_date >= ? AND entry_date <= ? {ENTRY_ORDER}"
        );
        self.query_entries(
            &sql,
            params![
                user_id.to_string(),
                format_calendar_date(from),
                format_calendar_date(to)
            ],
        )
    }

    fn upsert_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<UpsertOutcome> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT user_id FROM mood_entries WHERE id = ?",
                [entry.id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let outcome = match owner {
            None => {
                insert_entry_row(&tx, user_id, entry)?;
                UpsertOutcome::Inserted
            }
            Some(owner) if owner == user_id.to_string() => {
                update_entry_row(&tx, user_id, entry)?;
                UpsertOutcome::Updated
            }
            Some(_) => {
                warn!(entry_id = %entry.id, "Entry ID owned by another user, skipping");
                UpsertOutcome::OwnedByOtherUser
            }
        };

        tx.commit()?;
        Ok(outcome)
    }

    fn count_entries(&self) -> StoreResult<usize> {
        let conn = self.conn()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM mood_entries", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

fn insert_entry_row(conn: &Connection, user_id: &UserId, entry: &MoodEntry) -> StoreResult<()> {
    conn.execute(
        &format!(
            "INSERT INTO mood_entries (user_id, {ENTRY_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ),
        params![
            user_id.to_string(),
            entry.id.to_string(),
            timestamp(entry.created_at),
            entry.person_name,
            format_calendar_date(entry.entry_date),
            entry.entry_time_label,
            entry.mood.get(),
            entry.anxiety.get(),
            entry.energy.get(),
            entry.notes,
            tags_json(&entry.triggers)?,
            tags_json(&entry.helped)?,
            entry.felt_safe,
        ],
    )?;
    Ok(())
}

fn update_entry_row(conn: &Connection, user_id: &UserId, entry: &MoodEntry) -> StoreResult<usize> {
    let updated = conn.execute(
        "UPDATE mood_entries SET
            created_at = ?, person_name = ?, entry_date = ?, entry_time_label = ?,
            mood = ?, anxiety = ?, energy = ?, notes = ?,
            triggers_json = ?, helped_json = ?, felt_safe = ?
         WHERE id = ? AND user_id = ?",
        params![
            timestamp(entry.created_at),
            entry.person_name,
            format_calendar_date(entry.entry_date),
            entry.entry_time_label,
            entry.mood.get(),
            entry.anxiety.get(),
            entry.energy.get(),
            entry.notes,
            tags_json(&entry.triggers)?,
            tags_json(&entry.helped)?,
            entry.felt_safe,
            entry.id.to_string(),
            user_id.to_string(),
        ],
    )?;
    Ok(updated)
}

fn filter_clause(filter: EntryFilter) -> String {
    match filter {
        EntryFilter::All => String::new(),
        EntryFilter::LowMood => format!(" AND mood <= {LOW_MOOD_THRESHOLD}"),
        EntryFilter::HighAnxiety => format!(" AND anxiety >= {HIGH_ANXIETY_THRESHOLD}"),
        EntryFilter::NotSafe => " AND felt_safe = 0".to_string(),
    }
}

/// Fixed-width UTC timestamps so text ordering matches time ordering
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp '{s}': {e}")))
}

fn parse_id<T: std::str::FromStr>(s: &str) -> StoreResult<T> {
    s.parse()
        .map_err(|_| StoreError::Corrupt(format!("bad id '{s}'")))
}

fn tags_json(tags: &[String]) -> StoreResult<Option<String>> {
    if tags.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::to_string(tags)?))
}

fn parse_tags(json: Option<String>) -> StoreResult<Vec<String>> {
    match json {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Vec::new()),
    }
}

fn parse_scale(column: &str, value: i64) -> StoreResult<Scale> {
    Scale::new(value).map_err(|e| StoreError::Corrupt(format!("{column}: {e}")))
}

struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    full_name: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            full_name: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_record(self) -> StoreResult<UserRecord> {
        Ok(UserRecord {
            id: parse_id(&self.id)?,
            email: self.email,
            password_hash: self.password_hash,
            full_name: self.full_name,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

struct EntryRow {
    id: String,
    created_at: String,
    person_name: String,
    entry_date: String,
    entry_time_label: Option<String>,
    mood: i64,
    anxiety: i64,
    energy: i64,
    notes: Option<String>,
    triggers_json: Option<String>,
    helped_json: Option<String>,
    felt_safe: bool,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            person_name: row.get(2)?,
            entry_date: row.get(3)?,
            entry_time_label: row.get(4)?,
            mood: row.get(5)?,
            anxiety: row.get(6)?,
            energy: row.get(7)?,
            notes: row.get(8)?,
            triggers_json: row.get(9)?,
            helped_json: row.get(10)?,
            felt_safe: row.get(11)?,
        })
    }

    fn into_entry(self) -> StoreResult<MoodEntry> {
        let entry_date = parse_calendar_date(&self.entry_date)
            .ok_or_else(|| StoreError::Corrupt(format!("bad entry_date '{}'", self.entry_date)))?;

        Ok(MoodEntry {
            id: parse_id(&self.id)?,
            created_at: parse_timestamp(&self.created_at)?,
            person_name: self.person_name,
            entry_date,
            entry_time_label: self.entry_time_label,
            mood: parse_scale("mood", self.mood)?,
            anxiety: parse_scale("anxiety", self.anxiety)?,
            energy: parse_scale("energy", self.energy)?,
            notes: self.notes,
            triggers: parse_tags(self.triggers_json)?,
            helped: parse_tags(self.helped_json)?,
            felt_safe: self.felt_safe,
        })
    }
}
