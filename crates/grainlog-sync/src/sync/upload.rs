//! Upload pass: drain the replication queue against the remote store.
//!
//! Entries are processed strictly in enqueue order, one at a time. The
//! local write that produced each entry already committed, so delivery is
//! at-least-once and the remote upsert makes replays harmless.

use crate::db::{
    MetaRepository, QueueRepository, RecordRepository, SqliteMetaRepository,
    SqliteQueueRepository, SqliteRecordRepository, META_LAST_UPLOAD_SYNC,
};
use crate::error::Result;
use crate::models::Operation;
use crate::sync::orchestrator::SyncContext;
use crate::sync::remote::RemoteStore;
use crate::util::now_ms;

/// Tally of one upload pass.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct UploadOutcome {
    pub(crate) sent: usize,
    /// Deliveries whose snapshot a concurrent local write made stale; the
    /// refreshed entry stays queued
    pub(crate) superseded: usize,
    pub(crate) transient_failures: usize,
    pub(crate) permanent_failures: usize,
}

impl UploadOutcome {
    /// True when every entry in the pass was delivered and retired
    pub(crate) const fn clean(&self) -> bool {
        self.superseded == 0 && self.transient_failures == 0 && self.permanent_failures == 0
    }
}

/// Process all currently-pending queue entries. A failing entry never
/// blocks the rest of the batch; each failure is recorded on its own
/// entry and the pass moves on.
pub(crate) async fn run(ctx: &SyncContext, remote: &dyn RemoteStore) -> Result<UploadOutcome> {
    let entries = {
        let db = ctx.db.lock().await;
        SqliteQueueRepository::new(db.connection()).pending_in_order()?
    };

    let mut outcome = UploadOutcome::default();
    for entry in entries {
        // Snapshot the record and claim the entry before going on the
        // wire; the db lock is never held across the network call
        let record = {
            let db = ctx.db.lock().await;
            SqliteQueueRepository::new(db.connection()).mark_in_progress(entry.id)?;
            let record =
                SqliteRecordRepository::new(db.connection()).get(entry.table, &entry.entity_id)?;
            ctx.publish(&db);
            record
        };

        let Some(record) = record else {
            tracing::warn!(
                table = %entry.table,
                entity_id = %entry.entity_id,
                "queue entry without a local record; dropping it"
            );
            let db = ctx.db.lock().await;
            SqliteQueueRepository::new(db.connection()).remove(entry.id)?;
            ctx.publish(&db);
            continue;
        };

        let result = match entry.operation {
            Operation::Insert | Operation::Update => remote.upsert(entry.table, &record).await,
            Operation::Delete => {
                remote
                    .soft_delete(
                        entry.table,
                        &entry.entity_id,
                        record.deleted_at.unwrap_or(record.updated_at),
                        record.updated_at,
                    )
                    .await
            }
        };

        let db = ctx.db.lock().await;
        let queue = SqliteQueueRepository::new(db.connection());
        match result {
            Ok(()) => {
                // Only retire the entry if no local write coalesced into it
                // while the snapshot was on the wire; a reset entry carries
                // a fresh intent the remote has not seen
                if queue.remove_delivered(entry.id)? {
                    outcome.sent += 1;
                    tracing::debug!(
                        table = %entry.table,
                        entity_id = %entry.entity_id,
                        operation = %entry.operation,
                        "delivered queue entry"
                    );
                } else {
                    outcome.superseded += 1;
                    tracing::debug!(
                        table = %entry.table,
                        entity_id = %entry.entity_id,
                        "delivered snapshot superseded by a newer local write; entry requeued"
                    );
                }
            }
            Err(error) if error.is_transient() => {
                queue.mark_pending(entry.id)?;
                outcome.transient_failures += 1;
                tracing::debug!(
                    table = %entry.table,
                    entity_id = %entry.entity_id,
                    %error,
                    "transient upload failure; entry retried next run"
                );
            }
            Err(error) => {
                queue.mark_failed(entry.id, &error.to_string())?;
                outcome.permanent_failures += 1;
                tracing::warn!(
                    table = %entry.table,
                    entity_id = %entry.entity_id,
                    %error,
                    "permanent upload failure; entry parked for user action"
                );
            }
        }
        ctx.publish(&db);
    }

    if outcome.clean() {
        let db = ctx.db.lock().await;
        SqliteMetaRepository::new(db.connection()).set_cursor(META_LAST_UPLOAD_SYNC, now_ms())?;
    }

    Ok(outcome)
}
