//! Journal service: the business operations behind the HTTP API

use bluehour_api::{
    CreateEntryRequest, DEFAULT_PERSON_NAME, EntryFilter, ImportOutcome, ImportRecord,
    LoginRequest, MoodEntry, Report, SignUpRequest, UpdateEntryRequest, User,
};
use bluehour_config::ServiceConfig;
use bluehour_store::{
    AuditEvent, AuditEventType, SessionRecord, Store, StoreError, UpsertOutcome, UserRecord,
};
use bluehour_util::{EntryId, UserId, trailing_days};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::{
    CoreError, CoreResult, PasswordHasher, SessionToken, aggregate, validate_import,
    validate_login, validate_new_entry, validate_patch, validate_sign_up,
};

/// Journal operations, scoped per user
pub struct JournalService {
    store: Arc<dyn Store>,
    hasher: PasswordHasher,
    session_ttl: Duration,
}

impl JournalService {
    pub fn new(store: Arc<dyn Store>, config: &ServiceConfig) -> Self {
        info!(
            session_ttl_secs = config.sessions.ttl.as_secs(),
            password_iterations = config.auth.password_iterations,
            "Journal service initialized"
        );

        Self {
            store,
            hasher: PasswordHasher::new(config.auth.password_iterations),
            session_ttl: config.sessions.ttl,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// How long a login session lasts
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Register a new account
    pub fn sign_up(&self, req: &SignUpRequest) -> CoreResult<User> {
        let valid = validate_sign_up(req)?;

        if self.store.find_user_by_email(&valid.email)?.is_some() {
            debug!("Sign-up for registered email refused");
            return Err(CoreError::EmailTaken);
        }

        let now = utc_now();
        let record = UserRecord {
            id: UserId::new(),
            email: valid.email,
            password_hash: self.hasher.hash(&valid.password),
            full_name: valid.full_name,
            created_at: now,
            updated_at: now,
        };

        match self.store.create_user(&record) {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(CoreError::EmailTaken),
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %record.id, "User signed up");
        self.audit(AuditEventType::UserSignedUp { user_id: record.id });

        Ok(record.to_user())
    }

    /// Check credentials and open a session
    pub fn log_in(&self, req: &LoginRequest) -> CoreResult<(User, SessionToken)> {
        let valid = validate_login(req)?;

        let user = self
            .store
            .find_user_by_email(&valid.email)?
            .filter(|user| self.hasher.verify(&valid.password, &user.password_hash));

        let Some(user) = user else {
            info!("Login failed");
            self.audit(AuditEventType::LoginFailed { email: valid.email });
            return Err(CoreError::InvalidCredentials);
        };

        let token = SessionToken::generate();
        let now = utc_now();
        let ttl = chrono::Duration::from_std(self.session_ttl)
            .unwrap_or_else(|_| chrono::Duration::days(7));
        self.store.create_session(&SessionRecord {
            token_digest: token.digest(),
            user_id: user.id,
            created_at: now,
            expires_at: now + ttl,
        })?;

        info!(user_id = %user.id, "User logged in");
        self.audit(AuditEventType::LoginSucceeded { user_id: user.id });

        Ok((user.to_user(), token))
    }

    /// End a session. Unknown tokens are ignored.
    pub fn log_out(&self, token: &SessionToken) -> CoreResult<()> {
        let digest = token.digest();
        if let Some(session) = self.store.find_session(&digest)? {
            self.store.delete_session(&digest)?;
            info!(user_id = %session.user_id, "User logged out");
            self.audit(AuditEventType::LoggedOut {
                user_id: session.user_id,
            });
        }
        Ok(())
    }

    /// Resolve a session token to its user. Expired sessions are removed.
    pub fn authenticate(&self, token: &SessionToken) -> CoreResult<Option<User>> {
        let digest = token.digest();
        let Some(session) = self.store.find_session(&digest)? else {
            return Ok(None);
        };

        if session.is_expired(utc_now()) {
            debug!(user_id = %session.user_id, "Session expired");
            self.store.delete_session(&digest)?;
            return Ok(None);
        }

        Ok(self
            .store
            .find_user_by_id(&session.user_id)?
            .map(|record| record.to_user()))
    }

    pub fn create_entry(&self, user: &User, req: &CreateEntryRequest) -> CoreResult<MoodEntry> {
        let valid = validate_new_entry(req)?;

        let entry = MoodEntry {
            id: EntryId::new(),
            created_at: utc_now(),
            person_name: DEFAULT_PERSON_NAME.to_string(),
            entry_date: valid.entry_date,
            entry_time_label: valid.entry_time_label,
            mood: valid.mood,
            anxiety: valid.anxiety,
            energy: valid.energy,
            notes: valid.notes,
            triggers: valid.triggers,
            helped: valid.helped,
            felt_safe: valid.felt_safe,
        };
        self.store.insert_entry(&user.id, &entry)?;

        info!(user_id = %user.id, entry_id = %entry.id, "Entry created");
        self.audit(AuditEventType::EntryCreated {
            user_id: user.id,
            entry_id: entry.id,
        });

        Ok(entry)
    }

    pub fn update_entry(
        &self,
        user: &User,
        id: &EntryId,
        req: &UpdateEntryRequest,
    ) -> CoreResult<MoodEntry> {
        let patch = validate_patch(req)?;

        let mut entry = self
            .store
            .get_entry(&user.id, id)?
            .ok_or(CoreError::EntryNotFound)?;
        patch.apply_to(&mut entry);

        if !self.store.update_entry(&user.id, &entry)? {
            return Err(CoreError::EntryNotFound);
        }

        info!(user_id = %user.id, entry_id = %id, "Entry updated");
        self.audit(AuditEventType::EntryUpdated {
            user_id: user.id,
            entry_id: *id,
        });

        Ok(entry)
    }

    pub fn delete_entry(&self, user: &User, id: &EntryId) -> CoreResult<()> {
        if !self.store.delete_entry(&user.id, id)? {
            return Err(CoreError::EntryNotFound);
        }

        info!(user_id = %user.id, entry_id = %id, "Entry deleted");
        self.audit(AuditEventType::EntryDeleted {
            user_id: user.id,
            entry_id: *id,
        });

        Ok(())
    }

    /// The user's entries matching `filter`, newest first
    pub fn list_entries(&self, user: &User, filter: EntryFilter) -> CoreResult<Vec<MoodEntry>> {
        Ok(self.store.list_entries(&user.id, filter)?)
    }

    /// Every entry the user owns, newest first
    pub fn export_entries(&self, user: &User) -> CoreResult<Vec<MoodEntry>> {
        let entries = self.store.list_entries(&user.id, EntryFilter::All)?;

        info!(user_id = %user.id, count = entries.len(), "Entries exported");
        self.audit(AuditEventType::EntriesExported {
            user_id: user.id,
            count: entries.len(),
        });

        Ok(entries)
    }

    /// Upsert a previously exported payload into the user's journal.
    ///
    /// Each record is written on its own. Records whose ID belongs to someone
    /// else, and records the store fails to write, are counted as skipped.
    pub fn import_entries(&self, user: &User, records: &[ImportRecord]) -> CoreResult<ImportOutcome> {
        let entries = validate_import(records, utc_now())?;

        let mut imported = 0;
        let mut skipped = 0;
        for entry in &entries {
            match self.store.upsert_entry(&user.id, entry) {
                Ok(UpsertOutcome::Inserted | UpsertOutcome::Updated) => imported += 1,
                Ok(UpsertOutcome::OwnedByOtherUser) => skipped += 1,
                Err(e) => {
                    warn!(
                        user_id = %user.id,
                        entry_id = %entry.id,
                        error = %e,
                        "Failed to import entry"
                    );
                    skipped += 1;
                }
            }
        }

        info!(user_id = %user.id, imported, skipped, "Entries imported");
        self.audit(AuditEventType::EntriesImported {
            user_id: user.id,
            imported,
            skipped,
        });

        Ok(ImportOutcome::new(imported, skipped))
    }

    /// Rolling report over the `days` days ending at `reference`
    pub fn report(&self, user: &User, days: i64, reference: NaiveDate) -> CoreResult<Report> {
        let (from, to) = trailing_days(reference, days);
        let entries = self.store.list_entries_between(&user.id, from, to)?;
        Ok(aggregate(&entries, days, reference))
    }

    /// Drop sessions past their expiry
    pub fn purge_expired_sessions(&self) -> CoreResult<usize> {
        Ok(self.store.delete_expired_sessions(utc_now())?)
    }

    /// Note a request refused by the admission guard
    pub fn record_rate_limited(&self, key: &str) {
        self.audit(AuditEventType::RateLimited {
            key: key.to_string(),
        });
    }

    fn audit(&self, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::new(event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}

/// Current time at the precision the store keeps
fn utc_now() -> DateTime<Utc> {
    bluehour_util::now().with_timezone(&Utc).trunc_subsecs(6)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluehour_api::TagsInput;
    use bluehour_store::{SqliteStore, StoreResult};
    use bluehour_util::parse_calendar_date;

    fn service() -> JournalService {
        let store: Arc<dyn Store> = Arc::new(SqliteStore::in_memory().unwrap());
        let mut config = ServiceConfig::default();
        config.auth.password_iterations = 1_000;
        JournalService::new(store, &config)
    }

    fn sign_up(service: &JournalService, email: &str) -> User {
        service
            .sign_up(&SignUpRequest {
                email: email.into(),
                password: "password123".into(),
                full_name: "Test User".into(),
            })
            .unwrap()
    }

    fn checkin(date: &str, mood: i64) -> CreateEntryRequest {
        CreateEntryRequest {
            entry_date: date.into(),
            entry_time_label: None,
            mood,
            anxiety: 5,
            energy: 5,
            notes: None,
            triggers: Some(TagsInput::Joined("work".into())),
            helped: None,
            felt_safe: Some(true),
        }
    }

    fn date(s: &str) -> NaiveDate {
        parse_calendar_date(s).unwrap()
    }

    #[test]
    fn sign_up_then_log_in() {
        let service = service();
        let user = sign_up(&service, "Alice@Example.com");
        assert_eq!(user.email, "alice@example.com");

        let (logged_in, token) = service
            .log_in(&LoginRequest {
                email: "alice@example.com".into(),
                password: "password123".into(),
            })
            .unwrap();
        assert_eq!(logged_in.id, user.id);

        let authed = service.authenticate(&token).unwrap().unwrap();
        assert_eq!(authed.id, user.id);

        service.log_out(&token).unwrap();
        assert!(service.authenticate(&token).unwrap().is_none());
        service.log_out(&token).unwrap();
    }

    #[test]
    fn duplicate_sign_up_rejected() {
        let service = service();
        sign_up(&service, "alice@example.com");

        let err = service
            .sign_up(&SignUpRequest {
                email: "ALICE@example.com".into(),
                password: "password123".into(),
                full_name: "Other".into(),
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::EmailTaken));
    }

    #[test]
    fn bad_credentials_indistinguishable() {
        let service = service();
        sign_up(&service, "alice@example.com");

        let wrong_password = service
            .log_in(&LoginRequest {
                email: "alice@example.com".into(),
                password: "nope-nope".into(),
            })
            .unwrap_err();
        let unknown_email = service
            .log_in(&LoginRequest {
                email: "bob@example.com".into(),
                password: "password123".into(),
            })
            .unwrap_err();

        assert!(matches!(wrong_password, CoreError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[test]
    fn expired_session_is_dropped() {
        let service = service();
        let user = sign_up(&service, "alice@example.com");

        let token = SessionToken::generate();
        let past = utc_now() - chrono::Duration::hours(1);
        service
            .store()
            .create_session(&SessionRecord {
                token_digest: token.digest(),
                user_id: user.id,
                created_at: past - chrono::Duration::days(7),
                expires_at: past,
            })
            .unwrap();

        assert!(service.authenticate(&token).unwrap().is_none());
        assert!(service.store().find_session(&token.digest()).unwrap().is_none());
    }

    #[test]
    fn purge_removes_only_expired() {
        let service = service();
        let user = sign_up(&service, "alice@example.com");
        service
            .log_in(&LoginRequest {
                email: "alice@example.com".into(),
                password: "password123".into(),
            })
            .unwrap();

        let past = utc_now() - chrono::Duration::hours(1);
        service
            .store()
            .create_session(&SessionRecord {
                token_digest: "stale".into(),
                user_id: user.id,
                created_at: past,
                expires_at: past,
            })
            .unwrap();

        assert_eq!(service.purge_expired_sessions().unwrap(), 1);
    }

    #[test]
    fn entry_lifecycle() {
        let service = service();
        let user = sign_up(&service, "alice@example.com");

        let entry = service.create_entry(&user, &checkin("2025-01-10", 6)).unwrap();
        assert_eq!(entry.person_name, DEFAULT_PERSON_NAME);
        assert_eq!(entry.triggers, vec!["work"]);

        let updated = service
            .update_entry(
                &user,
                &entry.id,
                &UpdateEntryRequest {
                    mood: Some(2),
                    notes: Some("rough evening".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.mood.get(), 2);
        assert_eq!(updated.anxiety, entry.anxiety);

        let low = service.list_entries(&user, EntryFilter::LowMood).unwrap();
        assert_eq!(low, vec![updated]);

        service.delete_entry(&user, &entry.id).unwrap();
        assert!(matches!(
            service.delete_entry(&user, &entry.id),
            Err(CoreError::EntryNotFound)
        ));
    }

    #[test]
    fn entries_scoped_to_owner() {
        let service = service();
        let alice = sign_up(&service, "alice@example.com");
        let bob = sign_up(&service, "bob@example.com");

        let entry = service.create_entry(&alice, &checkin("2025-01-10", 6)).unwrap();

        assert!(service.list_entries(&bob, EntryFilter::All).unwrap().is_empty());
        assert!(matches!(
            service.update_entry(
                &bob,
                &entry.id,
                &UpdateEntryRequest {
                    mood: Some(1),
                    ..Default::default()
                }
            ),
            Err(CoreError::EntryNotFound)
        ));
        assert!(matches!(
            service.delete_entry(&bob, &entry.id),
            Err(CoreError::EntryNotFound)
        ));
    }

    #[test]
    fn export_then_import_round_trip() {
        let service = service();
        let alice = sign_up(&service, "alice@example.com");
        let bob = sign_up(&service, "bob@example.com");

        service.create_entry(&alice, &checkin("2025-01-09", 4)).unwrap();
        service.create_entry(&alice, &checkin("2025-01-10", 7)).unwrap();

        let exported = service.export_entries(&alice).unwrap();
        let payload: Vec<ImportRecord> =
            serde_json::from_value(serde_json::to_value(&exported).unwrap()).unwrap();

        let again = service.import_entries(&alice, &payload).unwrap();
        assert_eq!(again.imported, 2);
        assert_eq!(again.skipped, 0);
        assert_eq!(service.export_entries(&alice).unwrap(), exported);

        let foreign = service.import_entries(&bob, &payload).unwrap();
        assert_eq!(foreign.imported, 0);
        assert_eq!(foreign.skipped, 2);
        assert_eq!(foreign.message, "Imported 0 entries (2 entries skipped).");
        assert!(service.export_entries(&bob).unwrap().is_empty());
    }

    #[test]
    fn report_covers_range() {
        let service = service();
        let user = sign_up(&service, "alice@example.com");

        service.create_entry(&user, &checkin("2025-01-03", 1)).unwrap();
        service.create_entry(&user, &checkin("2025-01-09", 4)).unwrap();
        service.create_entry(&user, &checkin("2025-01-10", 8)).unwrap();

        let report = service.report(&user, 7, date("2025-01-10")).unwrap();
        assert_eq!(report.summary.count, 2);
        assert_eq!(report.summary.mean_mood, Some(6.0));
        assert_eq!(report.daily.len(), 7);
        assert_eq!(report.entries[0].entry_date, date("2025-01-10"));
    }

    /// Store that refuses to upsert one particular entry
    struct FailingUpsert {
        inner: SqliteStore,
        poisoned: EntryId,
    }

    impl Store for FailingUpsert {
        fn append_audit(&self, event: AuditEvent) -> StoreResult<()> {
            self.inner.append_audit(event)
        }
        fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>> {
            self.inner.get_recent_audits(limit)
        }
        fn create_user(&self, user: &UserRecord) -> StoreResult<()> {
            self.inner.create_user(user)
        }
        fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
            self.inner.find_user_by_email(email)
        }
        fn find_user_by_id(&self, id: &UserId) -> StoreResult<Option<UserRecord>> {
            self.inner.find_user_by_id(id)
        }
        fn count_users(&self) -> StoreResult<usize> {
            self.inner.count_users()
        }
        fn create_session(&self, session: &SessionRecord) -> StoreResult<()> {
            self.inner.create_session(session)
        }
        fn find_session(&self, token_digest: &str) -> StoreResult<Option<SessionRecord>> {
            self.inner.find_session(token_digest)
        }
        fn delete_session(&self, token_digest: &str) -> StoreResult<bool> {
            self.inner.delete_session(token_digest)
        }
        fn delete_expired_sessions(&self, now: DateTime<Utc>) -> StoreResult<usize> {
            self.inner.delete_expired_sessions(now)
        }
        fn insert_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<()> {
            self.inner.insert_entry(user_id, entry)
        }
        fn get_entry(&self, user_id: &UserId, id: &EntryId) -> StoreResult<Option<MoodEntry>> {
            self.inner.get_entry(user_id, id)
        }
        fn update_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<bool> {
            self.inner.update_entry(user_id, entry)
        }
        fn delete_entry(&self, user_id: &UserId, id: &EntryId) -> StoreResult<bool> {
            self.inner.delete_entry(user_id, id)
        }
        fn list_entries(&self, user_id: &UserId, filter: EntryFilter) -> StoreResult<Vec<MoodEntry>> {
            self.inner.list_entries(user_id, filter)
        }
        fn list_entries_between(
            &self,
            user_id: &UserId,
            from: NaiveDate,
            to: NaiveDate,
        ) -> StoreResult<Vec<MoodEntry>> {
            self.inner.list_entries_between(user_id, from, to)
        }
        fn upsert_entry(&self, user_id: &UserId, entry: &MoodEntry) -> StoreResult<UpsertOutcome> {
            if entry.id == self.poisoned {
                return Err(StoreError::Database("database is locked".into()));
            }
            self.inner.upsert_entry(user_id, entry)
        }
        fn count_entries(&self) -> StoreResult<usize> {
            self.inner.count_entries()
        }
        fn is_healthy(&self) -> bool {
            self.inner.is_healthy()
        }
    }

    fn import_record(id: &EntryId, date: &str) -> ImportRecord {
        ImportRecord {
            id: Some(id.to_string()),
            created_at: None,
            person_name: DEFAULT_PERSON_NAME.into(),
            entry_date: date.into(),
            entry_time_label: None,
            mood: 5,
            anxiety: 5,
            energy: 5,
            notes: None,
            triggers: None,
            helped: None,
            felt_safe: true,
        }
    }

    #[test]
    fn import_counts_store_failures_as_skipped() {
        let poisoned = EntryId::new();
        let store: Arc<dyn Store> = Arc::new(FailingUpsert {
            inner: SqliteStore::in_memory().unwrap(),
            poisoned,
        });
        let mut config = ServiceConfig::default();
        config.auth.password_iterations = 1_000;
        let service = JournalService::new(store.clone(), &config);
        let alice = sign_up(&service, "alice@example.com");

        let first = EntryId::new();
        let last = EntryId::new();
        let payload = vec![
            import_record(&first, "2025-01-08"),
            import_record(&poisoned, "2025-01-09"),
            import_record(&last, "2025-01-10"),
        ];

        let outcome = service.import_entries(&alice, &payload).unwrap();
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.skipped, 1);
        assert!(outcome.success);

        let ids: Vec<EntryId> = service
            .export_entries(&alice)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec![last, first]);

        let audited = store.get_recent_audits(10).unwrap().into_iter().any(|a| {
            matches!(
                a.event,
                AuditEventType::EntriesImported {
                    imported: 2,
                    skipped: 1,
                    ..
                }
            )
        });
        assert!(audited);
    }
}
