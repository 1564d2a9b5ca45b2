//! Request and response bodies of the JSON API
//!
//! Request bodies are deliberately loose (plain strings and integers) so
//! that field-level problems surface as validation messages instead of
//! opaque deserialization failures.

use serde::{Deserialize, Serialize};

use crate::{DEFAULT_PERSON_NAME, User};

/// `POST /api/auth/signup`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// `POST /api/auth/login`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Tags arrive either as the raw comma-separated text of a form field or
/// as an already-split list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    Joined(String),
    List(Vec<String>),
}

/// `POST /api/entries`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryRequest {
    pub entry_date: String,
    #[serde(default)]
    pub entry_time_label: Option<String>,
    pub mood: i64,
    pub anxiety: i64,
    pub energy: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub triggers: Option<TagsInput>,
    #[serde(default)]
    pub helped: Option<TagsInput>,
    #[serde(default)]
    pub felt_safe: Option<bool>,
}

/// `PATCH /api/entries/{id}`; every field optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateEntryRequest {
    pub entry_date: Option<String>,
    pub entry_time_label: Option<String>,
    pub mood: Option<i64>,
    pub anxiety: Option<i64>,
    pub energy: Option<i64>,
    pub notes: Option<String>,
    pub triggers: Option<TagsInput>,
    pub helped: Option<TagsInput>,
    pub felt_safe: Option<bool>,
}

fn default_person_name() -> String {
    DEFAULT_PERSON_NAME.to_string()
}

/// One element of an import payload (the export format, with most fields
/// optional so older exports still load)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default = "default_person_name")]
    pub person_name: String,
    pub entry_date: String,
    #[serde(default)]
    pub entry_time_label: Option<String>,
    pub mood: i64,
    pub anxiety: i64,
    pub energy: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub triggers: Option<Vec<String>>,
    #[serde(default)]
    pub helped: Option<Vec<String>>,
    #[serde(default)]
    pub felt_safe: bool,
}

/// Result of an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub imported: usize,
    pub skipped: usize,
    pub message: String,
}

impl ImportOutcome {
    pub fn new(imported: usize, skipped: usize) -> Self {
        let message = if skipped > 0 {
            format!("Imported {imported} entries ({skipped} entries skipped).")
        } else {
            format!("Imported {imported} entries.")
        };

        Self {
            success: true,
            imported,
            skipped,
            message,
        }
    }
}

/// Response to signup and login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub user: User,
}

/// Response to `GET /api/auth/me`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
}

/// Response to deletions and logout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Response to `GET /api/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub api_version: u32,
    pub timestamp: String,
    pub store: bool,
}

/// Error body returned with every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
