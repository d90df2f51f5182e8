//! Mutation queue repository implementation

use crate::db::parse_column;
use crate::error::{Error, Result};
use crate::models::{FailedEntrySummary, Operation, QueueCounts, QueueEntry, SyncTable};
use rusqlite::{params, Connection};

/// Trait for mutation queue storage operations
pub trait QueueRepository {
    /// Upsert the replication intent for (table, entity id), coalescing
    /// into any existing entry. A fresh write always resets the entry to
    /// `pending`, clearing a stale failure; an undelivered `insert` stays
    /// an `insert` whatever the newer intent, since the remote has never
    /// seen the row.
    fn upsert_intent(
        &self,
        table: SyncTable,
        entity_id: &str,
        operation: Operation,
        now: i64,
    ) -> Result<QueueEntry>;

    /// Get the entry for (table, entity id), if any
    fn get(&self, table: SyncTable, entity_id: &str) -> Result<Option<QueueEntry>>;

    /// All `pending` entries in enqueue order
    fn pending_in_order(&self) -> Result<Vec<QueueEntry>>;

    /// Transition an entry to `in_progress`
    fn mark_in_progress(&self, id: i64) -> Result<()>;

    /// Revert an entry to `pending` after a transient failure
    fn mark_pending(&self, id: i64) -> Result<()>;

    /// Park an entry as `failed` with the remote's error message
    fn mark_failed(&self, id: i64, error: &str) -> Result<()>;

    /// Remove an entry after confirmed delivery (or explicit discard)
    fn remove(&self, id: i64) -> Result<()>;

    /// Remove an entry only while it is still claimed by the delivering
    /// run. Returns false when a concurrent local write coalesced into the
    /// entry mid-flight (resetting it to `pending`); the refreshed intent
    /// must survive, since the delivered snapshot predates it.
    fn remove_delivered(&self, id: i64) -> Result<bool>;

    /// Reset any `in_progress` entries left by an interrupted run
    fn reset_in_progress(&self) -> Result<usize>;

    /// Reset all `failed` entries to `pending`
    fn retry_failed(&self) -> Result<usize>;

    /// Drop all `failed` entries, abandoning their replication intents
    fn discard_failed(&self) -> Result<usize>;

    /// Aggregate queue depth
    fn counts(&self) -> Result<QueueCounts>;

    /// Per-table failure diagnostics
    fn failed_summary(&self) -> Result<Vec<FailedEntrySummary>>;
}

/// `SQLite` implementation of `QueueRepository`
pub struct SqliteQueueRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteQueueRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a queue entry from a database row
    fn parse_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueueEntry> {
        let tbl: String = row.get(1)?;
        let operation: String = row.get(3)?;
        let status: String = row.get(4)?;
        Ok(QueueEntry {
            id: row.get(0)?,
            table: parse_column(1, &tbl)?,
            entity_id: row.get(2)?,
            operation: parse_column(3, &operation)?,
            status: parse_column(4, &status)?,
            attempts: row.get(5)?,
            last_error: row.get(6)?,
            enqueued_at: row.get(7)?,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, tbl, entity_id, operation, status, attempts, last_error, enqueued_at";

impl QueueRepository for SqliteQueueRepository<'_> {
    fn upsert_intent(
        &self,
        table: SyncTable,
        entity_id: &str,
        operation: Operation,
        now: i64,
    ) -> Result<QueueEntry> {
        match self.get(table, entity_id)? {
            None => {
                self.conn.execute(
                    "INSERT INTO sync_queue (tbl, entity_id, operation, status, attempts, enqueued_at)
                     VALUES (?, ?, ?, 'pending', 0, ?)",
                    params![table.as_str(), entity_id, operation.as_str(), now],
                )?;
            }
            Some(existing) => {
                let coalesced = if existing.operation == Operation::Insert {
                    Operation::Insert
                } else {
                    operation
                };
                // Keep the original enqueued_at so enqueue order is preserved
                self.conn.execute(
                    "UPDATE sync_queue
                     SET operation = ?, status = 'pending', attempts = 0, last_error = NULL
                     WHERE id = ?",
                    params![coalesced.as_str(), existing.id],
                )?;
            }
        }

        self.get(table, entity_id)?
            .ok_or_else(|| Error::NotFound(format!("{table}/{entity_id}")))
    }

    fn get(&self, table: SyncTable, entity_id: &str) -> Result<Option<QueueEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM sync_queue WHERE tbl = ? AND entity_id = ?");
        let result =
            self.conn
                .query_row(&sql, params![table.as_str(), entity_id], Self::parse_entry);

        match result {
            Ok(entry) => Ok(Some(entry)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn pending_in_order(&self) -> Result<Vec<QueueEntry>> {
        let sql =
            format!("SELECT {ENTRY_COLUMNS} FROM sync_queue WHERE status = 'pending' ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;

        let entries = stmt
            .query_map([], Self::parse_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    fn mark_in_progress(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_queue SET status = 'in_progress' WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    fn mark_pending(&self, id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_queue SET status = 'pending', attempts = attempts + 1 WHERE id = ?",
            params![id],
        )?;
        Ok(())
    }

    fn mark_failed(&self, id: i64, error: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE sync_queue
             SET status = 'failed', attempts = attempts + 1, last_error = ?
             WHERE id = ?",
            params![error, id],
        )?;
        Ok(())
    }

    fn remove(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM sync_queue WHERE id = ?", params![id])?;
        Ok(())
    }

    fn remove_delivered(&self, id: i64) -> Result<bool> {
        let removed = self.conn.execute(
            "DELETE FROM sync_queue WHERE id = ? AND status = 'in_progress'",
            params![id],
        )?;
        Ok(removed > 0)
    }

    fn reset_in_progress(&self) -> Result<usize> {
        let reset = self.conn.execute(
            "UPDATE sync_queue SET status = 'pending' WHERE status = 'in_progress'",
            [],
        )?;
        Ok(reset)
    }

    fn retry_failed(&self) -> Result<usize> {
        // attempts are kept as diagnostics across retries
        let reset = self.conn.execute(
            "UPDATE sync_queue SET status = 'pending', last_error = NULL WHERE status = 'failed'",
            [],
        )?;
        Ok(reset)
    }

    fn discard_failed(&self) -> Result<usize> {
        let dropped = self
            .conn
            .execute("DELETE FROM sync_queue WHERE status = 'failed'", [])?;
        Ok(dropped)
    }

    fn counts(&self) -> Result<QueueCounts> {
        let counts = self.conn.query_row(
            "SELECT
                COUNT(*) FILTER (WHERE status IN ('pending', 'in_progress')),
                COUNT(*) FILTER (WHERE status = 'failed')
             FROM sync_queue",
            [],
            |row| {
                Ok(QueueCounts {
                    active: row.get(0)?,
                    failed: row.get(1)?,
                })
            },
        )?;
        Ok(counts)
    }

    fn failed_summary(&self) -> Result<Vec<FailedEntrySummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT tbl, operation, COUNT(*)
             FROM sync_queue
             WHERE status = 'failed'
             GROUP BY tbl, operation
             ORDER BY tbl, operation",
        )?;

        let summaries = stmt
            .query_map([], |row| {
                let tbl: String = row.get(0)?;
                let operation: String = row.get(1)?;
                Ok(FailedEntrySummary {
                    table: parse_column(0, &tbl)?,
                    operation: parse_column(1, &operation)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(summaries)
    }
}
