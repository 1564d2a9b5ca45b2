//! Schema migrations, tracked with `PRAGMA user_version`

use rusqlite::Connection;
use tracing::{debug, info};

use crate::StoreResult;

/// Ordered list of migrations; index + 1 is the schema version it produces
const MIGRATIONS: &[&str] = &[
    // 1: accounts and check-ins
    r#"
    CREATE TABLE users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL UNIQUE COLLATE NOCASE,
        password_hash TEXT NOT NULL,
        full_name TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE mood_entries (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        person_name TEXT NOT NULL,
        entry_date TEXT NOT NULL,
        entry_time_label TEXT,
        mood INTEGER NOT NULL CHECK (mood BETWEEN 1 AND 10),
        anxiety INTEGER NOT NULL CHECK (anxiety BETWEEN 1 AND 10),
        energy INTEGER NOT NULL CHECK (energy BETWEEN 1 AND 10),
        notes TEXT,
        triggers_json TEXT,
        helped_json TEXT,
        felt_safe INTEGER NOT NULL DEFAULT 1
    );

    CREATE INDEX idx_entries_user_date ON mood_entries(user_id, entry_date DESC, created_at DESC);
    "#,
    // 2: login sessions and audit log
    r#"
    CREATE TABLE sessions (
        token_digest TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        expires_at TEXT NOT NULL
    );

    CREATE INDEX idx_sessions_expiry ON sessions(expires_at);

    CREATE TABLE audit_log (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp TEXT NOT NULL,
        event_json TEXT NOT NULL
    );

    CREATE INDEX idx_audit_timestamp ON audit_log(timestamp);
    "#,
];

/// Latest schema version
pub const SCHEMA_VERSION: i64 = MIGRATIONS.len() as i64;

/// Bring the schema up to [`SCHEMA_VERSION`]
pub fn migrate(conn: &mut Connection) -> StoreResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current >= SCHEMA_VERSION {
        debug!(version = current, "Store schema up to date");
        return Ok(());
    }

    for (index, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let version = index as i64 + 1;
        let tx = conn.transaction()?;
        tx.execute_batch(sql)?;
        tx.pragma_update(None, "user_version", version)?;
        tx.commit()?;
        info!(version, "Applied store migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrate_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap();

        let version: i64 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn resumes_from_partial_schema() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS[0]).unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();

        migrate(&mut conn).unwrap();

        let sessions: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sessions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(sessions, 1);
    }
}
