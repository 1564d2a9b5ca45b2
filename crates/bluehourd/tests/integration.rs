//! Integration tests for bluehourd
//!
//! These tests drive the library crates the way the daemon wires them:
//! config from disk, an on-disk store, the journal service and the guard.

use bluehour_api::{CreateEntryRequest, SignUpRequest};
use bluehour_config::load_config;
use bluehour_core::JournalService;
use bluehour_store::{SqliteStore, Store};
use bluehour_util::{AdmissionGuard, DATABASE_FILENAME, MonotonicInstant};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;

const CONFIG: &str = r#"
config_version = 1

[server]
bind = "127.0.0.1:0"

[rate_limit]
window_ms = 1000
max_requests = 2

[auth]
password_iterations = 1000

[report]
default_days = 7
max_days = 30
"#;

fn checkin(date: &str, mood: i64, felt_safe: bool) -> CreateEntryRequest {
    CreateEntryRequest {
        entry_date: date.into(),
        entry_time_label: Some("evening".into()),
        mood,
        anxiety: 4,
        energy: 5,
        notes: None,
        triggers: None,
        helped: None,
        felt_safe: Some(felt_safe),
    }
}

#[test]
fn test_config_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.rate_limit.max_requests, 2);
    assert_eq!(config.rate_limit.window, Duration::from_secs(1));
    assert_eq!(config.auth.password_iterations, 1000);
    assert_eq!(config.report.resolve_days(None), 7);
    assert_eq!(config.report.resolve_days(Some(400)), 30);
}

#[test]
fn test_journal_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    std::fs::write(&config_path, CONFIG).unwrap();
    let config = load_config(&config_path).unwrap();
    let db_path = dir.path().join(DATABASE_FILENAME);

    let user = {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
        let journal = JournalService::new(store, &config);

        let user = journal
            .sign_up(&SignUpRequest {
                email: "Dana@Example.com".into(),
                password: "correct horse".into(),
                full_name: "Dana".into(),
            })
            .unwrap();

        journal.create_entry(&user, &checkin("2025-03-09", 6, true)).unwrap();
        journal.create_entry(&user, &checkin("2025-03-10", 8, false)).unwrap();
        journal.create_entry(&user, &checkin("2025-01-01", 2, true)).unwrap();
        user
    };

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&db_path).unwrap());
    assert!(store.is_healthy());
    assert_eq!(store.count_users().unwrap(), 1);
    assert_eq!(store.count_entries().unwrap(), 3);

    let found = store
        .find_user_by_email("dana@example.com")
        .unwrap()
        .unwrap()
        .to_user();
    assert_eq!(found.id, user.id);

    let journal = JournalService::new(store, &config);
    let reference = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
    let report = journal
        .report(&found, config.report.resolve_days(None), reference)
        .unwrap();

    assert_eq!(report.days, 7);
    assert_eq!(report.daily.len(), 7);
    assert_eq!(report.from, NaiveDate::from_ymd_opt(2025, 3, 4).unwrap());
    assert_eq!(report.to, reference);
    assert_eq!(report.summary.count, 2);
    assert_eq!(report.summary.mean_mood, Some(7.0));
    assert_eq!(report.summary.felt_safe_percent, Some(50.0));
    assert_eq!(report.entries[0].entry_date, reference);
}

#[test]
fn test_guard_follows_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, CONFIG).unwrap();
    let config = load_config(&path).unwrap();

    let guard = AdmissionGuard::new(config.rate_limit.max_requests, config.rate_limit.window);
    let start = MonotonicInstant::now();

    assert!(guard.admit_at("login:10.0.0.1", start));
    assert!(guard.admit_at("login:10.0.0.1", start));
    assert!(!guard.admit_at("login:10.0.0.1", start));
    assert!(guard.admit_at("signup:10.0.0.1", start));

    let later = start + config.rate_limit.window + Duration::from_millis(1);
    assert!(guard.admit_at("login:10.0.0.1", later));

    assert_eq!(guard.sweep_at(later + config.rate_limit.window * 2), 2);
    assert_eq!(guard.tracked_keys(), 0);
}
