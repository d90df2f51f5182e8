//! Conflict audit log repository implementation

use crate::db::parse_column;
use crate::error::Result;
use crate::models::{SyncConflict, SyncTable};
use rusqlite::{params, Connection};

/// Trait for conflict audit log operations
pub trait ConflictRepository {
    /// Append a conflict entry
    fn record(
        &self,
        table: SyncTable,
        entity_id: &str,
        resolved_by: &str,
        now: i64,
    ) -> Result<SyncConflict>;

    /// Most recent conflicts, newest first
    fn recent(&self, limit: usize) -> Result<Vec<SyncConflict>>;

    /// Drop conflicts recorded strictly before `horizon` (Unix ms)
    fn prune_before(&self, horizon: i64) -> Result<usize>;
}

/// `SQLite` implementation of `ConflictRepository`
pub struct SqliteConflictRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteConflictRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_conflict(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncConflict> {
        let tbl: String = row.get(1)?;
        Ok(SyncConflict {
            id: row.get(0)?,
            table: parse_column(1, &tbl)?,
            entity_id: row.get(2)?,
            resolved_by: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl ConflictRepository for SqliteConflictRepository<'_> {
    fn record(
        &self,
        table: SyncTable,
        entity_id: &str,
        resolved_by: &str,
        now: i64,
    ) -> Result<SyncConflict> {
        self.conn.execute(
            "INSERT INTO sync_conflicts (tbl, entity_id, resolved_by, created_at)
             VALUES (?, ?, ?, ?)",
            params![table.as_str(), entity_id, resolved_by, now],
        )?;

        Ok(SyncConflict {
            id: self.conn.last_insert_rowid(),
            table,
            entity_id: entity_id.to_string(),
            resolved_by: resolved_by.to_string(),
            created_at: now,
        })
    }

    fn recent(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, tbl, entity_id, resolved_by, created_at
             FROM sync_conflicts
             ORDER BY created_at DESC, id DESC
             LIMIT ?",
        )?;

        #[allow(clippy::cast_possible_wrap)]
        let conflicts = stmt
            .query_map(params![limit as i64], Self::parse_conflict)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(conflicts)
    }

    fn prune_before(&self, horizon: i64) -> Result<usize> {
        let pruned = self.conn.execute(
            "DELETE FROM sync_conflicts WHERE created_at < ?",
            params![horizon],
        )?;
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;

    fn setup() -> Database {
        Database::open_in_memory().unwrap()
    }

    #[test]
    fn test_record_and_recent() {
        let db = setup();
        let repo = SqliteConflictRepository::new(db.connection());

        repo.record(SyncTable::Rolls, "r1", "server_wins", 10).unwrap();
        repo.record(SyncTable::Frames, "f1", "server_wins", 20).unwrap();

        let recent = repo.recent(10).unwrap();
        assert_eq!(recent.len(), 2);
        // newest first
        assert_eq!(recent[0].entity_id, "f1");
        assert_eq!(recent[1].entity_id, "r1");
    }

    #[test]
    fn test_recent_respects_limit() {
        let db = setup();
        let repo = SqliteConflictRepository::new(db.connection());

        for i in 0..5 {
            repo.record(SyncTable::Rolls, &format!("r{i}"), "server_wins", i)
                .unwrap();
        }

        assert_eq!(repo.recent(3).unwrap().len(), 3);
    }

    #[test]
    fn test_prune_before_horizon() {
        let db = setup();
        let repo = SqliteConflictRepository::new(db.connection());

        repo.record(SyncTable::Rolls, "old", "server_wins", 10).unwrap();
        repo.record(SyncTable::Rolls, "new", "server_wins", 30).unwrap();

        assert_eq!(repo.prune_before(20).unwrap(), 1);
        let recent = repo.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].entity_id, "new");
    }
}
