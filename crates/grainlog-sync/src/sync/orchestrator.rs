//! Sync orchestrator: serializes upload/download runs, tracks
//! connectivity, and derives the caller-facing sync state.
//!
//! One orchestrator is constructed per process/session and shared by
//! reference; all run-in-progress and connectivity state lives here
//! rather than in module-level globals.

use crate::db::{
    ConflictRepository, Database, MetaRepository, QueueRepository, SqliteConflictRepository,
    SqliteMetaRepository, SqliteQueueRepository, SqliteRecordRepository, WritePath,
    META_LAST_DOWNLOAD_SYNC, META_LAST_UPLOAD_SYNC, META_SEEDED,
};
use crate::db::RecordRepository;
use crate::error::Result;
use crate::models::{FailedEntrySummary, Record, RecordId, SyncConflict, SyncTable};
use crate::sync::remote::RemoteStore;
use crate::sync::{download, upload, SyncStatus};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

/// Shared state for one sync session.
pub(crate) struct SyncContext {
    pub(crate) db: Mutex<Database>,
    pub(crate) user_id: String,
    pub(crate) remote: Option<Arc<dyn RemoteStore>>,
    pub(crate) online: AtomicBool,
    pub(crate) running: AtomicBool,
    pub(crate) run_guard: Mutex<()>,
    pub(crate) status_tx: watch::Sender<SyncStatus>,
}

impl SyncContext {
    /// Recompute and publish the derived status. Called after every queue
    /// transition so observers never poll.
    pub(crate) fn publish(&self, db: &Database) {
        match SqliteQueueRepository::new(db.connection()).counts() {
            Ok(counts) => {
                let status = SyncStatus::derive(
                    self.remote.is_some(),
                    self.online.load(Ordering::SeqCst),
                    self.running.load(Ordering::SeqCst),
                    counts,
                );
                self.status_tx.send_replace(status);
            }
            Err(error) => tracing::warn!(%error, "failed to recompute sync status"),
        }
    }
}

/// Outcome of one `sync_now` run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Whether a run actually happened (false when dropped: local-only,
    /// offline, or another run was already active)
    pub ran: bool,
    /// Queue entries delivered and retired
    pub uploaded: usize,
    /// Upload attempts that failed this run (transient and permanent)
    pub upload_failures: usize,
    /// Remote rows applied locally
    pub downloaded: usize,
    /// Conflicts resolved during the download pass
    pub conflicts: usize,
}

/// Saved sync cursors (Unix ms).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCursors {
    pub last_upload: i64,
    pub last_download: i64,
}

/// Serializes sync runs and exposes caller-facing sync operations.
#[derive(Clone)]
pub struct SyncOrchestrator {
    ctx: Arc<SyncContext>,
}

impl SyncOrchestrator {
    /// Create an orchestrator for an identified session syncing against
    /// `remote` on behalf of `user_id`. Starts offline until a
    /// connectivity signal arrives.
    pub fn new(
        db: Database,
        user_id: impl Into<String>,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self> {
        Self::build(db, user_id.into(), Some(remote))
    }

    /// Create an orchestrator for a session without a remote identity.
    /// No network activity is ever attempted; writes still work locally.
    pub fn local_only(db: Database, user_id: impl Into<String>) -> Result<Self> {
        Self::build(db, user_id.into(), None)
    }

    fn build(db: Database, user_id: String, remote: Option<Arc<dyn RemoteStore>>) -> Result<Self> {
        // Entries left in_progress by an interrupted run would otherwise
        // never be picked up again
        let queue = SqliteQueueRepository::new(db.connection());
        let reset = queue.reset_in_progress()?;
        if reset > 0 {
            tracing::info!(reset, "recovered interrupted queue entries to pending");
        }

        let counts = queue.counts()?;
        let (status_tx, _) = watch::channel(SyncStatus::derive(
            remote.is_some(),
            false,
            false,
            counts,
        ));

        Ok(Self {
            ctx: Arc::new(SyncContext {
                db: Mutex::new(db),
                user_id,
                remote,
                online: AtomicBool::new(false),
                running: AtomicBool::new(false),
                run_guard: Mutex::new(()),
                status_tx,
            }),
        })
    }

    /// Subscribe to derived status updates
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.ctx.status_tx.subscribe()
    }

    /// Latest derived status
    #[must_use]
    pub fn current_status(&self) -> SyncStatus {
        *self.ctx.status_tx.borrow()
    }

    /// Record a connectivity signal and republish the derived state. Does
    /// not trigger a run by itself; callers invoke [`Self::sync_now`].
    pub async fn set_online(&self, online: bool) {
        self.ctx.online.store(online, Ordering::SeqCst);
        let db = self.ctx.db.lock().await;
        self.ctx.publish(&db);
    }

    /// Apply a local write: create when `id` is `None`, otherwise replace
    /// the record's fields. Applies locally and enqueues in one atomic
    /// unit; never blocks on the network.
    pub async fn write(
        &self,
        table: SyncTable,
        id: Option<&RecordId>,
        fields: Map<String, Value>,
    ) -> Result<Record> {
        let db = self.ctx.db.lock().await;
        let write = WritePath::new(db.connection());
        let record = match id {
            None => write.create(table, &self.ctx.user_id, fields)?,
            Some(id) => write.update(table, id, fields)?,
        };
        self.ctx.publish(&db);
        Ok(record)
    }

    /// Tombstone a record locally and enqueue the deletion
    pub async fn delete(&self, table: SyncTable, id: &RecordId) -> Result<Record> {
        let db = self.ctx.db.lock().await;
        let record = WritePath::new(db.connection()).delete(table, id)?;
        self.ctx.publish(&db);
        Ok(record)
    }

    /// Read a record back, tombstoned rows included
    pub async fn record(&self, table: SyncTable, id: &RecordId) -> Result<Option<Record>> {
        let db = self.ctx.db.lock().await;
        SqliteRecordRepository::new(db.connection()).get(table, &id.as_str())
    }

    /// List a user's live records for one table, newest first
    pub async fn records(&self, table: SyncTable) -> Result<Vec<Record>> {
        let db = self.ctx.db.lock().await;
        SqliteRecordRepository::new(db.connection()).list(table, &self.ctx.user_id)
    }

    /// Trigger one run (upload then download), returning when it settles.
    ///
    /// Drops the request instead of queueing when a run is already active
    /// or the session is local-only/offline; the next external trigger
    /// picks up whatever queue state remains.
    pub async fn sync_now(&self) -> Result<SyncReport> {
        let Some(remote) = self.ctx.remote.clone() else {
            tracing::debug!("sync requested on local-only session; skipping");
            return Ok(SyncReport::default());
        };

        let Ok(_guard) = self.ctx.run_guard.try_lock() else {
            tracing::debug!("sync already running; dropping request");
            return Ok(SyncReport::default());
        };

        if !self.ctx.online.load(Ordering::SeqCst) {
            tracing::debug!("offline; skipping sync run");
            return Ok(SyncReport::default());
        }

        self.ctx.running.store(true, Ordering::SeqCst);
        {
            let db = self.ctx.db.lock().await;
            self.ctx.publish(&db);
        }

        let result = async {
            let up = upload::run(&self.ctx, remote.as_ref()).await?;
            let down = download::run(&self.ctx, remote.as_ref()).await?;
            Ok::<_, crate::error::Error>((up, down))
        }
        .await;

        self.ctx.running.store(false, Ordering::SeqCst);
        {
            let db = self.ctx.db.lock().await;
            self.ctx.publish(&db);
        }

        let (up, down) = result?;
        tracing::info!(
            uploaded = up.sent,
            upload_failures = up.transient_failures + up.permanent_failures,
            downloaded = down.applied,
            conflicts = down.conflicts,
            "sync run settled"
        );
        Ok(SyncReport {
            ran: true,
            uploaded: up.sent,
            upload_failures: up.transient_failures + up.permanent_failures,
            downloaded: down.applied,
            conflicts: down.conflicts,
        })
    }

    /// Reset all failed entries to pending so the next run retries them
    pub async fn retry_failed(&self) -> Result<usize> {
        let db = self.ctx.db.lock().await;
        let reset = SqliteQueueRepository::new(db.connection()).retry_failed()?;
        self.ctx.publish(&db);
        Ok(reset)
    }

    /// Drop all failed entries, abandoning their replication intents.
    /// The local records themselves are untouched.
    pub async fn discard_failed(&self) -> Result<usize> {
        let db = self.ctx.db.lock().await;
        let dropped = SqliteQueueRepository::new(db.connection()).discard_failed()?;
        self.ctx.publish(&db);
        Ok(dropped)
    }

    /// Per-table counts and operation kinds for failed entries
    pub async fn failed_summary(&self) -> Result<Vec<FailedEntrySummary>> {
        let db = self.ctx.db.lock().await;
        SqliteQueueRepository::new(db.connection()).failed_summary()
    }

    /// Most recent conflict audit entries, newest first
    pub async fn recent_conflicts(&self, limit: usize) -> Result<Vec<SyncConflict>> {
        let db = self.ctx.db.lock().await;
        SqliteConflictRepository::new(db.connection()).recent(limit)
    }

    /// Prune conflict audit entries recorded before `horizon` (Unix ms)
    pub async fn prune_conflicts(&self, horizon: i64) -> Result<usize> {
        let db = self.ctx.db.lock().await;
        SqliteConflictRepository::new(db.connection()).prune_before(horizon)
    }

    /// Saved upload/download cursors
    pub async fn sync_cursors(&self) -> Result<SyncCursors> {
        let db = self.ctx.db.lock().await;
        let meta = SqliteMetaRepository::new(db.connection());
        Ok(SyncCursors {
            last_upload: meta.cursor(META_LAST_UPLOAD_SYNC)?,
            last_download: meta.cursor(META_LAST_DOWNLOAD_SYNC)?,
        })
    }

    /// Run `seed` through the write path exactly once per store, gated on
    /// the `seeded` bootstrap flag. Returns whether seeding ran.
    pub async fn seed_once<F>(&self, seed: F) -> Result<bool>
    where
        F: FnOnce(&WritePath<'_>) -> Result<()>,
    {
        let db = self.ctx.db.lock().await;
        let meta = SqliteMetaRepository::new(db.connection());
        if meta.get(META_SEEDED)?.is_some() {
            return Ok(false);
        }
        seed(&WritePath::new(db.connection()))?;
        meta.set(META_SEEDED, "1")?;
        self.ctx.publish(&db);
        Ok(true)
    }
}
