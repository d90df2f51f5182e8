//! Remote store interface.
//!
//! The remote is an external collaborator: a relational store with one
//! table per domain entity, keyed by `id`, filterable by `user_id` and
//! `updated_at`. Row-level access is assumed to be scoped to the
//! authenticated owner by the remote side.

use crate::models::{Record, SyncTable};
use async_trait::async_trait;
use thiserror::Error;

/// Remote failure, split by retry semantics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Connectivity loss, timeout, or 5xx-class failure; retried
    /// automatically on the next run
    #[error("transient remote error: {0}")]
    Transient(String),

    /// The remote rejected the payload as structurally invalid; parked
    /// until a human retries or discards the entry
    #[error("permanent remote error: {0}")]
    Permanent(String),
}

impl RemoteError {
    /// Whether the next run should retry this automatically
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Result type for remote store calls
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Server-side relational store consumed by the sync engine.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert-or-replace a row keyed by its id
    async fn upsert(&self, table: SyncTable, record: &Record) -> RemoteResult<()>;

    /// Soft-delete: an update setting the tombstone field. A missing row
    /// is a no-op, matching relational `UPDATE ... WHERE id = ?` semantics.
    async fn soft_delete(
        &self,
        table: SyncTable,
        id: &str,
        deleted_at: i64,
        updated_at: i64,
    ) -> RemoteResult<()>;

    /// Rows owned by `user_id` with `updated_at` strictly greater than
    /// `since`, in ascending `updated_at` order
    async fn pull(&self, table: SyncTable, user_id: &str, since: i64) -> RemoteResult<Vec<Record>>;
}
