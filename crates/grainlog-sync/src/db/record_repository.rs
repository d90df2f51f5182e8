//! Domain record repository implementation

use crate::db::parse_column;
use crate::error::Result;
use crate::models::{Record, SyncTable};
use rusqlite::{params, Connection};

/// Trait for domain record storage operations
pub trait RecordRepository {
    /// Get a record by ID, tombstoned rows included (the sync engine must
    /// see them to propagate deletions)
    fn get(&self, table: SyncTable, id: &str) -> Result<Option<Record>>;

    /// Insert or fully replace a record
    fn upsert(&self, table: SyncTable, record: &Record) -> Result<()>;

    /// List a user's live records (excluding tombstones), newest first
    fn list(&self, table: SyncTable, user_id: &str) -> Result<Vec<Record>>;
}

/// `SQLite` implementation of `RecordRepository`
pub struct SqliteRecordRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteRecordRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Parse a record from a database row
    fn parse_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<Record> {
        let id: String = row.get(0)?;
        let fields: String = row.get(2)?;
        Ok(Record {
            id: parse_column(0, &id)?,
            user_id: row.get(1)?,
            fields: serde_json::from_str(&fields).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?,
            deleted_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }
}

impl RecordRepository for SqliteRecordRepository<'_> {
    fn get(&self, table: SyncTable, id: &str) -> Result<Option<Record>> {
        let sql = format!(
            "SELECT id, user_id, fields, deleted_at, updated_at FROM {} WHERE id = ?",
            table.as_str()
        );
        let result = self
            .conn
            .query_row(&sql, params![id], Self::parse_record);

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert(&self, table: SyncTable, record: &Record) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (id, user_id, fields, deleted_at, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 user_id = excluded.user_id,
                 fields = excluded.fields,
                 deleted_at = excluded.deleted_at,
                 updated_at = excluded.updated_at",
            table.as_str()
        );
        self.conn.execute(
            &sql,
            params![
                record.id.as_str(),
                record.user_id,
                serde_json::to_string(&record.fields)?,
                record.deleted_at,
                record.updated_at
            ],
        )?;
        Ok(())
    }

    fn list(&self, table: SyncTable, user_id: &str) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT id, user_id, fields, deleted_at, updated_at
             FROM {}
             WHERE user_id = ? AND deleted_at IS NULL
             ORDER BY updated_at DESC",
            table.as_str()
        );
        let mut stmt = self.conn.prepare(&sql)?;

        let records = stmt
            .query_map(params![user_id], Self::parse_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }
}
