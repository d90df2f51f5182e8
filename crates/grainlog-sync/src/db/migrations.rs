//! Database migrations

use crate::error::Result;
use crate::models::SyncTable;
use rusqlite::Connection;
use std::fmt::Write as _;

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get::<_, i32>(0).map(|v| v != 0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: schema version tracking, domain tables, the
/// mutation queue, and the sync metadata map
fn migrate_v1(conn: &Connection) -> Result<()> {
    let mut sql = String::from(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );\n",
    );

    // One table per synchronizable entity; domain attributes live in a
    // JSON `fields` column the engine never interprets. Table names come
    // from the closed SyncTable enum, not user input.
    for table in SyncTable::ALL {
        let _ = write!(
            sql,
            "CREATE TABLE IF NOT EXISTS {t} (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                fields TEXT NOT NULL DEFAULT '{{}}',
                deleted_at INTEGER,
                updated_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_{t}_updated ON {t}(updated_at DESC);
            CREATE INDEX IF NOT EXISTS idx_{t}_user ON {t}(user_id);\n",
            t = table.as_str()
        );
    }

    sql.push_str(
        "CREATE TABLE IF NOT EXISTS sync_queue (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tbl TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            operation TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            enqueued_at INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sync_queue_entity ON sync_queue(tbl, entity_id);
        CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status);
        CREATE TABLE IF NOT EXISTS sync_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    );

    conn.execute_batch(&sql)?;
    tracing::info!("Migrated database to version 1");
    Ok(())
}

/// Migration to version 2: conflict audit log
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS sync_conflicts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tbl TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            resolved_by TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_entity ON sync_conflicts(tbl, entity_id);
        CREATE INDEX IF NOT EXISTS idx_sync_conflicts_created ON sync_conflicts(created_at DESC);
        INSERT INTO schema_version (version) VALUES (2);
        COMMIT;",
    )?;
    tracing::info!("Migrated database to version {CURRENT_VERSION}");
    Ok(())
}
