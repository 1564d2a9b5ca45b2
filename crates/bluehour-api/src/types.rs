//! Shared domain types

use bluehour_util::{EntryId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Display name stamped on entries written through the API
pub const DEFAULT_PERSON_NAME: &str = "Blue Hour";

/// Mood at or below this value counts as low
pub const LOW_MOOD_THRESHOLD: u8 = 3;

/// Anxiety at or above this value counts as high
pub const HIGH_ANXIETY_THRESHOLD: u8 = 8;

/// A 1..=10 self-rating (mood, anxiety or energy)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Scale(u8);

impl Scale {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: i64) -> Result<Self, ScaleOutOfRange> {
        if (Self::MIN as i64..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ScaleOutOfRange(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

/// Error for a rating outside 1..=10
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{0} is outside the 1-10 scale")]
pub struct ScaleOutOfRange(pub i64);

impl TryFrom<i64> for Scale {
    type Error = ScaleOutOfRange;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Scale> for u8 {
    fn from(scale: Scale) -> Self {
        scale.0
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: EntryId,
    pub created_at: DateTime<Utc>,
    pub person_name: String,
    /// Calendar day the check-in is about, chosen by the writer
    pub entry_date: NaiveDate,
    /// Free-form part of day, e.g. "morning"
    pub entry_time_label: Option<String>,
    pub mood: Scale,
    pub anxiety: Scale,
    pub energy: Scale,
    pub notes: Option<String>,
    #[serde(default)]
    pub triggers: Vec<String>,
    #[serde(default)]
    pub helped: Vec<String>,
    pub felt_safe: bool,
}

/// A validated check-in ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub entry_date: NaiveDate,
    pub entry_time_label: Option<String>,
    pub mood: Scale,
    pub anxiety: Scale,
    pub energy: Scale,
    pub notes: Option<String>,
    pub triggers: Vec<String>,
    pub helped: Vec<String>,
    pub felt_safe: bool,
}

/// A validated partial update. `None` leaves a field unchanged; for the
/// optional text fields, `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPatch {
    pub entry_date: Option<NaiveDate>,
    pub entry_time_label: Option<Option<String>>,
    pub mood: Option<Scale>,
    pub anxiety: Option<Scale>,
    pub energy: Option<Scale>,
    pub notes: Option<Option<String>>,
    pub triggers: Option<Vec<String>>,
    pub helped: Option<Vec<String>>,
    pub felt_safe: Option<bool>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply this patch to an existing entry
    pub fn apply_to(&self, entry: &mut MoodEntry) {
        if let Some(date) = self.entry_date {
            entry.entry_date = date;
        }
        if let Some(label) = &self.entry_time_label {
            entry.entry_time_label = label.clone();
        }
        if let Some(mood) = self.mood {
            entry.mood = mood;
        }
        if let Some(anxiety) = self.anxiety {
            entry.anxiety = anxiety;
        }
        if let Some(energy) = self.energy {
            entry.energy = energy;
        }
        if let Some(notes) = &self.notes {
            entry.notes = notes.clone();
        }
        if let Some(triggers) = &self.triggers {
            entry.triggers = triggers.clone();
        }
        if let Some(helped) = &self.helped {
            entry.helped = helped.clone();
        }
        if let Some(felt_safe) = self.felt_safe {
            entry.felt_safe = felt_safe;
        }
    }
}

/// History filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryFilter {
    #[default]
    All,
    /// Mood at or below [`LOW_MOOD_THRESHOLD`]
    LowMood,
    /// Anxiety at or above [`HIGH_ANXIETY_THRESHOLD`]
    HighAnxiety,
    /// Entries where the writer did not feel safe
    NotSafe,
}

impl EntryFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryFilter::All => "all",
            EntryFilter::LowMood => "low_mood",
            EntryFilter::HighAnxiety => "high_anxiety",
            EntryFilter::NotSafe => "not_safe",
        }
    }
}

/// Error for an unrecognised filter name
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown filter: {0}")]
pub struct UnknownFilter(pub String);

impl FromStr for EntryFilter {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "all" => Ok(EntryFilter::All),
            "low_mood" => Ok(EntryFilter::LowMood),
            "high_anxiety" => Ok(EntryFilter::HighAnxiety),
            "not_safe" => Ok(EntryFilter::NotSafe),
            other => Err(UnknownFilter(other.to_string())),
        }
    }
}

impl fmt::Display for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered user, as shown to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}
