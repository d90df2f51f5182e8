//! Domain record model

use crate::util::now_ms;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A unique identifier for a domain record, using UUID v7 (time-sortable)
///
/// Assigned client-side at creation, never by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Create a new unique record ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A synchronizable domain row (camera, lens, film, roll, frame).
///
/// Domain attributes live in `fields`, an opaque JSON object the engine
/// never interprets; on the wire the fields are flattened next to the
/// system columns, matching the remote table shape
/// `{id, user_id, ...domain fields, deleted_at, updated_at}`. Callers must
/// not put system column names inside `fields`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Client-assigned unique identifier
    pub id: RecordId,
    /// Owning user identifier
    pub user_id: String,
    /// Domain attributes, replaced whole on every write (never field-merged)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    /// Soft-delete tombstone (Unix ms); rows are never physically removed
    #[serde(default)]
    pub deleted_at: Option<i64>,
    /// Last update timestamp (Unix ms), the record's version marker
    pub updated_at: i64,
}

impl Record {
    /// Create a new record owned by `user_id` with the given domain fields
    #[must_use]
    pub fn new(user_id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: RecordId::new(),
            user_id: user_id.into(),
            fields,
            deleted_at: None,
            updated_at: now_ms(),
        }
    }

    /// Whether this record carries a tombstone
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Replace the domain fields wholesale and advance the logical clock
    pub fn replace_fields(&mut self, fields: Map<String, Value>, now: i64) {
        self.fields = fields;
        self.updated_at = now;
    }

    /// Mark the record deleted, still advancing the logical clock so the
    /// tombstone propagates through sync
    pub fn tombstone(&mut self, now: i64) {
        self.deleted_at = Some(now);
        self.updated_at = now;
    }
}
