//! Strongly-typed identifiers for bluehour

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when an identifier string is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid identifier: {0}")]
pub struct InvalidId(String);

/// Parse the canonical hyphenated UUID form, the only form we hand out.
fn parse_hyphenated(s: &str) -> Result<Uuid, InvalidId> {
    if s.len() != uuid::fmt::Hyphenated::LENGTH {
        return Err(InvalidId(s.to_string()));
    }
    Uuid::try_parse(s).map_err(|_| InvalidId(s.to_string()))
}

/// Unique identifier for a registered user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hyphenated(s).map(Self)
    }
}

/// Unique identifier for a mood entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntryId {
    type Err = InvalidId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hyphenated(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_uniqueness() {
        let e1 = EntryId::new();
        let e2 = EntryId::new();
        assert_ne!(e1, e2);
    }

    #[test]
    fn entry_id_parses_hyphenated_only() {
        let id = EntryId::new();
        let parsed: EntryId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);

        let simple = id.as_uuid().simple().to_string();
        assert!(simple.parse::<EntryId>().is_err());
        assert!("not-a-uuid".parse::<EntryId>().is_err());
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let user_id = UserId::new();
        let json = serde_json::to_string(&user_id).unwrap();
        assert_eq!(json, format!("\"{}\"", user_id));

        let parsed: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(user_id, parsed);
    }
}
