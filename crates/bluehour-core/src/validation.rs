//! Request validation
//!
//! Every validator collects all field problems before failing, so a client
//! sees the full list at once. Field keys match the JSON field names; for
//! imports they are prefixed with the record index (`"3.mood"`).

use bluehour_api::{
    CreateEntryRequest, EntryPatch, ImportRecord, LoginRequest, MoodEntry, NewEntry, Scale,
    SignUpRequest, TagsInput, UpdateEntryRequest,
};
use bluehour_util::{EntryId, parse_calendar_date};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::{CoreError, CoreResult};

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MIN_NAME_CHARS: usize = 2;
pub const MAX_LABEL_CHARS: usize = 50;
pub const MAX_NOTES_CHARS: usize = 2000;
pub const MAX_TAGS: usize = 20;

/// Shown when a check-in or edit is rejected
pub const ENTRY_REJECTED_MESSAGE: &str =
    "Something went wrong saving your reflection. Please try again.";

/// Shown when an import payload is rejected
pub const IMPORT_REJECTED_MESSAGE: &str =
    "Invalid import data format. Please ensure you are importing a valid JSON export.";

/// Field name to list of problems with it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// First message, by field name
    pub fn first_message(&self) -> Option<&str> {
        self.0.values().flatten().next().map(String::as_str)
    }

    fn into_error(self, message: impl Into<String>) -> CoreError {
        CoreError::Validation {
            message: message.into(),
            details: self,
        }
    }

    fn into_error_with_first_message(self) -> CoreError {
        let message = self.first_message().unwrap_or("Invalid request").to_string();
        self.into_error(message)
    }

    /// Record the error of `result` under `field`, yielding the value on success
    fn check<T>(&mut self, field: impl Into<String>, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }
}

/// Validated sign-up data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    /// Trimmed and lowercased
    pub email: String,
    pub password: String,
    /// Trimmed
    pub full_name: String,
}

/// Validated login data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// Lowercase and trim an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Loose `local@domain.tld` shape check
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}

pub fn validate_sign_up(req: &SignUpRequest) -> CoreResult<SignUp> {
    let mut errors = FieldErrors::default();

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        errors.add("email", "Invalid email address");
    }
    if req.password.chars().count() < MIN_PASSWORD_CHARS {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_CHARS} characters"),
        );
    }
    let full_name = req.full_name.trim().to_string();
    if full_name.chars().count() < MIN_NAME_CHARS {
        errors.add(
            "full_name",
            format!("Name must be at least {MIN_NAME_CHARS} characters"),
        );
    }

    if !errors.is_empty() {
        return Err(errors.into_error_with_first_message());
    }

    Ok(SignUp {
        email,
        password: req.password.clone(),
        full_name,
    })
}

pub fn validate_login(req: &LoginRequest) -> CoreResult<Login> {
    let mut errors = FieldErrors::default();

    let email = normalize_email(&req.email);
    if !is_valid_email(&email) {
        errors.add("email", "Invalid email address");
    }
    if req.password.is_empty() {
        errors.add("password", "Password is required");
    }

    if !errors.is_empty() {
        return Err(errors.into_error_with_first_message());
    }

    Ok(Login {
        email,
        password: req.password.clone(),
    })
}

pub fn validate_new_entry(req: &CreateEntryRequest) -> CoreResult<NewEntry> {
    let mut errors = FieldErrors::default();

    let entry_date = errors.check("entry_date", parse_date(&req.entry_date));
    let entry_time_label = errors.check(
        "entry_time_label",
        optional_text(req.entry_time_label.as_deref(), MAX_LABEL_CHARS),
    );
    let mood = errors.check("mood", parse_scale(req.mood));
    let anxiety = errors.check("anxiety", parse_scale(req.anxiety));
    let energy = errors.check("energy", parse_scale(req.energy));
    let notes = errors.check(
        "notes",
        optional_text(req.notes.as_deref(), MAX_NOTES_CHARS),
    );

    let (
        Some(entry_date),
        Some(entry_time_label),
        Some(mood),
        Some(anxiety),
        Some(energy),
        Some(notes),
    ) = (entry_date, entry_time_label, mood, anxiety, energy, notes)
    else {
        return Err(errors.into_error(ENTRY_REJECTED_MESSAGE));
    };

    Ok(NewEntry {
        entry_date,
        entry_time_label,
        mood,
        anxiety,
        energy,
        notes,
        triggers: req.triggers.as_ref().map(normalize_tags).unwrap_or_default(),
        helped: req.helped.as_ref().map(normalize_tags).unwrap_or_default(),
        felt_safe: req.felt_safe.unwrap_or(false),
    })
}

/// Validate a partial update. A patch that changes nothing is rejected.
pub fn validate_patch(req: &UpdateEntryRequest) -> CoreResult<EntryPatch> {
    let mut errors = FieldErrors::default();
    let mut patch = EntryPatch::default();

    if let Some(date) = &req.entry_date {
        patch.entry_date = errors.check("entry_date", parse_date(date));
    }
    if let Some(label) = &req.entry_time_label {
        patch.entry_time_label = errors.check(
            "entry_time_label",
            optional_text(Some(label.as_str()), MAX_LABEL_CHARS),
        );
    }
    if let Some(mood) = req.mood {
        patch.mood = errors.check("mood", parse_scale(mood));
    }
    if let Some(anxiety) = req.anxiety {
        patch.anxiety = errors.check("anxiety", parse_scale(anxiety));
    }
    if let Some(energy) = req.energy {
        patch.energy = errors.check("energy", parse_scale(energy));
    }
    if let Some(notes) = &req.notes {
        patch.notes = errors.check("notes", optional_text(Some(notes.as_str()), MAX_NOTES_CHARS));
    }
    patch.triggers = req.triggers.as_ref().map(normalize_tags);
    patch.helped = req.helped.as_ref().map(normalize_tags);
    patch.felt_safe = req.felt_safe;

    if !errors.is_empty() {
        return Err(errors.into_error(ENTRY_REJECTED_MESSAGE));
    }
    if patch.is_empty() {
        let mut errors = FieldErrors::default();
        errors.add("entry", "At least one field must be provided");
        return Err(errors.into_error("Nothing to update."));
    }

    Ok(patch)
}

/// Validate an import payload, producing entries ready to upsert.
///
/// Records without an `id` get a fresh one; records without `created_at`
/// are stamped with `now`. Any invalid record rejects the whole payload.
pub fn validate_import(records: &[ImportRecord], now: DateTime<Utc>) -> CoreResult<Vec<MoodEntry>> {
    let mut errors = FieldErrors::default();
    let mut entries = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let key = |field: &str| format!("{index}.{field}");

        let id = match &record.id {
            Some(raw) => errors.check(
                key("id"),
                raw.parse::<EntryId>().map_err(|_| "Invalid uuid".to_string()),
            ),
            None => Some(EntryId::new()),
        };
        let created_at = match &record.created_at {
            Some(raw) => errors.check(
                key("created_at"),
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|_| "Invalid datetime".to_string()),
            ),
            None => Some(now),
        };
        let entry_date = errors.check(key("entry_date"), parse_date(&record.entry_date));
        let mood = errors.check(key("mood"), parse_scale(record.mood));
        let anxiety = errors.check(key("anxiety"), parse_scale(record.anxiety));
        let energy = errors.check(key("energy"), parse_scale(record.energy));

        let (Some(id), Some(created_at), Some(entry_date), Some(mood), Some(anxiety), Some(energy)) =
            (id, created_at, entry_date, mood, anxiety, energy)
        else {
            continue;
        };

        entries.push(MoodEntry {
            id,
            created_at,
            person_name: record.person_name.clone(),
            entry_date,
            entry_time_label: non_empty(record.entry_time_label.as_deref()),
            mood,
            anxiety,
            energy,
            notes: non_empty(record.notes.as_deref()),
            triggers: record.triggers.as_deref().map(clean_tags).unwrap_or_default(),
            helped: record.helped.as_deref().map(clean_tags).unwrap_or_default(),
            felt_safe: record.felt_safe,
        });
    }

    if !errors.is_empty() {
        return Err(errors.into_error(IMPORT_REJECTED_MESSAGE));
    }

    Ok(entries)
}

/// Split, trim and cap a tag field
pub fn normalize_tags(input: &TagsInput) -> Vec<String> {
    match input {
        TagsInput::Joined(text) => text
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .take(MAX_TAGS)
            .map(str::to_string)
            .collect(),
        TagsInput::List(items) => clean_tags(items),
    }
}

fn clean_tags(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_calendar_date(value).ok_or_else(|| "Invalid date format".to_string())
}

fn parse_scale(value: i64) -> Result<Scale, String> {
    Scale::new(value).map_err(|_| format!("Must be between {} and {}", Scale::MIN, Scale::MAX))
}

/// Length-checked optional text; empty means absent
fn optional_text(value: Option<&str>, max_chars: usize) -> Result<Option<String>, String> {
    match value {
        None | Some("") => Ok(None),
        Some(text) if text.chars().count() > max_chars => {
            Err(format!("Must be at most {max_chars} characters"))
        }
        Some(text) => Ok(Some(text.to_string())),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
