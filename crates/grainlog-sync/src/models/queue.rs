//! Mutation queue models

use crate::error::Error;
use crate::models::SyncTable;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of replication intent carried by a queue entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Insert,
    Update,
    Delete,
}

impl Operation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            other => Err(Error::InvalidInput(format!("unknown operation: {other}"))),
        }
    }
}

/// Queue entry status
///
/// `Failed` entries are inactive but unresolved: they persist until the
/// user retries or discards them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    InProgress,
    Failed,
}

impl QueueStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueueStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "failed" => Ok(Self::Failed),
            other => Err(Error::InvalidInput(format!("unknown queue status: {other}"))),
        }
    }
}

/// One outstanding intent to replicate a record's current state.
///
/// At most one entry exists per (table, entity id); newer local writes
/// coalesce into it, so the queue reflects "latest intended state" rather
/// than a full operation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Synthetic row identifier, also the enqueue order
    pub id: i64,
    /// Target table
    pub table: SyncTable,
    /// Target entity id
    pub entity_id: String,
    /// Replication operation kind
    pub operation: Operation,
    /// Current status
    pub status: QueueStatus,
    /// Delivery attempts so far (diagnostics only, never a give-up bound)
    pub attempts: i64,
    /// Message from the last permanent failure, if any
    pub last_error: Option<String>,
    /// Enqueue timestamp (Unix ms)
    pub enqueued_at: i64,
}

impl QueueEntry {
    /// Whether this entry is still awaiting delivery
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, QueueStatus::Pending | QueueStatus::InProgress)
    }
}

/// Aggregate queue depth, recomputed after every entry transition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    /// Entries pending or in progress
    pub active: i64,
    /// Entries needing user attention
    pub failed: i64,
}

/// Per-table diagnostics for failed entries, for user-facing display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedEntrySummary {
    pub table: SyncTable,
    pub operation: Operation,
    pub count: i64,
}
