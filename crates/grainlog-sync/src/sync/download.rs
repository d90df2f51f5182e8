//! Download pass: pull remote changes since the saved cursor and apply
//! them to the local store.
//!
//! Remote rows land whole, tombstones included. A row whose entity still
//! has an unresolved queue entry is escalated to the conflict resolver
//! instead of being applied blindly.

use crate::db::{
    ConflictRepository, MetaRepository, QueueRepository, RecordRepository,
    SqliteConflictRepository, SqliteMetaRepository, SqliteQueueRepository,
    SqliteRecordRepository, META_LAST_DOWNLOAD_SYNC,
};
use crate::error::{Error, Result};
use crate::models::{Record, SyncTable};
use crate::sync::orchestrator::SyncContext;
use crate::sync::remote::RemoteStore;
use crate::sync::resolver::{self, Winner, SERVER_WINS};
use crate::util::now_ms;
use rusqlite::Connection;

/// Tally of one download pass.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct DownloadOutcome {
    pub(crate) applied: usize,
    pub(crate) conflicts: usize,
}

/// Pull every table's window in turn and advance the cursor to the
/// highest `updated_at` seen. A pull failure propagates without touching
/// the cursor, so the next run retries the same window.
pub(crate) async fn run(ctx: &SyncContext, remote: &dyn RemoteStore) -> Result<DownloadOutcome> {
    let since = {
        let db = ctx.db.lock().await;
        SqliteMetaRepository::new(db.connection()).cursor(META_LAST_DOWNLOAD_SYNC)?
    };

    let mut outcome = DownloadOutcome::default();
    let mut max_seen: Option<i64> = None;

    for table in SyncTable::ALL {
        let rows = remote
            .pull(table, &ctx.user_id, since)
            .await
            .map_err(Error::Remote)?;
        if rows.is_empty() {
            continue;
        }

        let db = ctx.db.lock().await;
        for row in rows {
            max_seen = Some(max_seen.map_or(row.updated_at, |seen| seen.max(row.updated_at)));
            apply_row(db.connection(), table, &row, &mut outcome)?;
        }
        ctx.publish(&db);
    }

    // An empty window still advances the cursor so already-scanned
    // history is not re-pulled forever
    let cursor = max_seen.unwrap_or_else(now_ms);
    {
        let db = ctx.db.lock().await;
        SqliteMetaRepository::new(db.connection()).set_cursor(META_LAST_DOWNLOAD_SYNC, cursor)?;
    }

    tracing::debug!(
        applied = outcome.applied,
        conflicts = outcome.conflicts,
        cursor,
        "download pass finished"
    );
    Ok(outcome)
}

fn apply_row(
    conn: &Connection,
    table: SyncTable,
    incoming: &Record,
    outcome: &mut DownloadOutcome,
) -> Result<()> {
    let records = SqliteRecordRepository::new(conn);
    let id = incoming.id.as_str();

    let Some(local) = records.get(table, &id)? else {
        records.upsert(table, incoming)?;
        outcome.applied += 1;
        return Ok(());
    };

    // Any surviving queue entry, failed ones included, means a local
    // intent the remote has not seen yet
    if SqliteQueueRepository::new(conn).get(table, &id)?.is_some() {
        // An identical local row discards nothing: a prior pass already
        // applied this resolution but failed before advancing the cursor,
        // so re-pulling it must not append a second audit entry
        if local == *incoming {
            outcome.applied += 1;
            return Ok(());
        }

        let resolution = resolver::resolve(&local, incoming);
        match resolution.winner {
            Winner::Remote => records.upsert(table, incoming)?,
            Winner::Local => {}
        }
        if resolution.record_conflict {
            SqliteConflictRepository::new(conn).record(table, &id, SERVER_WINS, now_ms())?;
            tracing::info!(table = %table, entity_id = %id, "conflict resolved server-wins");
        }
        outcome.conflicts += 1;
    } else {
        records.upsert(table, incoming)?;
    }
    outcome.applied += 1;
    Ok(())
}
