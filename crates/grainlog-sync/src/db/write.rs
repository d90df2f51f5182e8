//! Local write path: apply a change to a domain record and enqueue its
//! replication intent as one atomic unit.
//!
//! Never touches the network; replication happens later when the
//! orchestrator drains the queue.

use crate::db::{
    QueueRepository, RecordRepository, SqliteQueueRepository, SqliteRecordRepository,
};
use crate::error::{Error, Result};
use crate::models::{Operation, Record, RecordId, SyncTable};
use crate::util::now_ms;
use rusqlite::Connection;
use serde_json::{Map, Value};

/// Atomic write path over a local store connection.
pub struct WritePath<'a> {
    conn: &'a Connection,
}

impl<'a> WritePath<'a> {
    /// Create a write path over the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new record with a client-assigned id and enqueue an
    /// `insert` intent
    pub fn create(
        &self,
        table: SyncTable,
        user_id: &str,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let record = Record::new(user_id, fields);
        self.apply(table, record, Operation::Insert)
    }

    /// Replace a record's domain fields, advance its clock, and coalesce
    /// an `update` intent
    pub fn update(
        &self,
        table: SyncTable,
        id: &RecordId,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let mut record = self.load(table, id)?;
        record.replace_fields(fields, now_ms());
        self.apply(table, record, Operation::Update)
    }

    /// Tombstone a record and coalesce a `delete` intent
    pub fn delete(&self, table: SyncTable, id: &RecordId) -> Result<Record> {
        let mut record = self.load(table, id)?;
        record.tombstone(now_ms());
        self.apply(table, record, Operation::Delete)
    }

    fn load(&self, table: SyncTable, id: &RecordId) -> Result<Record> {
        SqliteRecordRepository::new(self.conn)
            .get(table, &id.as_str())?
            .ok_or_else(|| Error::NotFound(format!("{table}/{id}")))
    }

    /// Apply the record and its queue intent in one transaction
    fn apply(&self, table: SyncTable, record: Record, operation: Operation) -> Result<Record> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;

        let outcome: Result<()> = (|| {
            SqliteRecordRepository::new(self.conn).upsert(table, &record)?;
            SqliteQueueRepository::new(self.conn).upsert_intent(
                table,
                &record.id.as_str(),
                operation,
                record.updated_at,
            )?;
            Ok(())
        })();

        match outcome {
            Ok(()) => {
                self.conn.execute_batch("COMMIT")?;
                tracing::debug!(table = %table, id = %record.id, op = %operation, "local write applied");
                Ok(record)
            }
            Err(e) => {
                self.conn.execute_batch("ROLLBACK").ok();
                Err(e)
            }
        }
    }
}
