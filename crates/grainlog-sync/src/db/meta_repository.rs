//! Sync metadata repository implementation

use crate::error::{Error, Result};
use rusqlite::{params, Connection};

/// Upload cursor key: last time a queue drain finished cleanly (Unix ms)
pub const META_LAST_UPLOAD_SYNC: &str = "last_upload_sync";
/// Download cursor key: max remote `updated_at` seen by a completed pull
pub const META_LAST_DOWNLOAD_SYNC: &str = "last_download_sync";
/// One-time bootstrap flag set after static seed data has been ingested
pub const META_SEEDED: &str = "seeded";

/// Trait for sync metadata operations (cursors and bootstrap flags)
pub trait MetaRepository {
    /// Get a metadata value
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a metadata value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Read a timestamp cursor; absent cursors read as 0 so a first pull
    /// covers all history
    fn cursor(&self, key: &str) -> Result<i64>;

    /// Advance a timestamp cursor
    fn set_cursor(&self, key: &str, value: i64) -> Result<()>;
}

/// `SQLite` implementation of `MetaRepository`
pub struct SqliteMetaRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteMetaRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl MetaRepository for SqliteMetaRepository<'_> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM sync_meta WHERE key = ?",
            params![key],
            |row| row.get(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?, ?)",
            params![key, value],
        )?;
        Ok(())
    }

    fn cursor(&self, key: &str) -> Result<i64> {
        match self.get(key)? {
            None => Ok(0),
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::InvalidInput(format!("malformed cursor {key}: {raw}"))),
        }
    }

    fn set_cursor(&self, key: &str, value: i64) -> Result<()> {
        self.set(key, &value.to_string())
    }
}
