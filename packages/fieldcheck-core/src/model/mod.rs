//! # Canonical Record Model
//!
//! The in-memory shape of a checklist and of a user profile, independent of
//! any storage backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         CANONICAL MODEL                                 │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  StoredChecklist                                                       │
//! │  ├── id: RecordId            (opaque, backend-assigned)                │
//! │  ├── owner_id: OwnerId       (fixed at creation)                       │
//! │  ├── created_at / updated_at (set by the store)                        │
//! │  └── record: ChecklistRecord                                           │
//! │       ├── 9 text fields      ("" means unset)                          │
//! │       ├── 3 TriState fields  (Yes / No / Unknown)                      │
//! │       └── Photos             (4 × Photo { device_uri, durable_image }) │
//! │                                                                         │
//! │  UserProfile                 (one per owner, upserted)                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod checklist;
mod profile;

pub use checklist::{
    map_link, ChecklistRecord, ChecklistSummary, Photo, PhotoField, Photos, StoredChecklist,
    TriState,
};
pub use profile::{format_national_id, format_phone_br, only_digits, UserProfile};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Opaque record identifier
///
/// The embedded backend hands out auto-incrementing integers, the remote
/// service an integer or a UUID. Callers must treat the value as a token:
/// never parse it, never compare ids that came from different backends.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Wrap a backend-issued identifier
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw token, for handing back to the same backend
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of the user who owns a record
///
/// Constructed only through [`OwnerId::parse`], so an adapter can never be
/// handed an empty owner and silently operate store-wide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Validate and wrap an owner id; blank input is rejected
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidOwner);
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The raw owner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<OwnerId> for String {
    fn from(value: OwnerId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_rejects_blank() {
        assert!(matches!(OwnerId::parse(""), Err(Error::InvalidOwner)));
        assert!(matches!(OwnerId::parse("   "), Err(Error::InvalidOwner)));
        assert_eq!(OwnerId::parse(" u1 ").unwrap().as_str(), "u1");
    }

    #[test]
    fn test_owner_id_deserialize_validates() {
        let ok: OwnerId = serde_json::from_str("\"u1\"").unwrap();
        assert_eq!(ok.as_str(), "u1");
        assert!(serde_json::from_str::<OwnerId>("\"\"").is_err());
    }

    #[test]
    fn test_record_id_is_transparent() {
        let id = RecordId::from(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
        assert_eq!(id.to_string(), "42");
    }
}
