//! In-memory remote store used by the test suite and local development.

use crate::models::{Record, SyncTable};
use crate::sync::remote::{RemoteError, RemoteResult, RemoteStore};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

type Key = (SyncTable, String);

#[derive(Default)]
struct MemoryState {
    rows: HashMap<Key, Record>,
    upsert_calls: u64,
    delete_calls: u64,
    offline: bool,
    fail_permanent: HashSet<Key>,
    fail_transient_once: HashSet<Key>,
}

/// A remote store backed by a process-local map, with injectable failures.
#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryState>,
}

impl MemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row as if another device had written it
    pub fn insert_row(&self, table: SyncTable, record: Record) {
        let mut state = self.lock();
        state.rows.insert((table, record.id.as_str()), record);
    }

    /// Current remote-side row, if any
    pub fn row(&self, table: SyncTable, id: &str) -> Option<Record> {
        self.lock().rows.get(&(table, id.to_string())).cloned()
    }

    /// Number of upsert calls served so far
    pub fn upsert_calls(&self) -> u64 {
        self.lock().upsert_calls
    }

    /// Number of soft-delete calls served so far
    pub fn delete_calls(&self) -> u64 {
        self.lock().delete_calls
    }

    /// Simulate a connectivity outage: every call fails transiently
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Reject every write for (table, id) as structurally invalid
    pub fn fail_permanently(&self, table: SyncTable, id: &str) {
        self.lock().fail_permanent.insert((table, id.to_string()));
    }

    /// Fail the next write for (table, id) transiently, then recover
    pub fn fail_transient_once(&self, table: SyncTable, id: &str) {
        self.lock()
            .fail_transient_once
            .insert((table, id.to_string()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn gate(state: &mut MemoryState, key: &Key) -> RemoteResult<()> {
        if state.offline {
            return Err(RemoteError::Transient("connection refused".to_string()));
        }
        if state.fail_transient_once.remove(key) {
            return Err(RemoteError::Transient("timeout".to_string()));
        }
        if state.fail_permanent.contains(key) {
            return Err(RemoteError::Permanent("payload rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upsert(&self, table: SyncTable, record: &Record) -> RemoteResult<()> {
        let mut state = self.lock();
        let key = (table, record.id.as_str());
        Self::gate(&mut state, &key)?;
        state.rows.insert(key, record.clone());
        state.upsert_calls += 1;
        Ok(())
    }

    async fn soft_delete(
        &self,
        table: SyncTable,
        id: &str,
        deleted_at: i64,
        updated_at: i64,
    ) -> RemoteResult<()> {
        let mut state = self.lock();
        let key = (table, id.to_string());
        Self::gate(&mut state, &key)?;
        if let Some(row) = state.rows.get_mut(&key) {
            row.deleted_at = Some(deleted_at);
            row.updated_at = updated_at;
        }
        state.delete_calls += 1;
        Ok(())
    }

    async fn pull(&self, table: SyncTable, user_id: &str, since: i64) -> RemoteResult<Vec<Record>> {
        let state = self.lock();
        if state.offline {
            return Err(RemoteError::Transient("connection refused".to_string()));
        }
        let mut rows: Vec<Record> = state
            .rows
            .iter()
            .filter(|((t, _), row)| {
                *t == table && row.user_id == user_id && row.updated_at > since
            })
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by_key(|row| row.updated_at);
        Ok(rows)
    }
}
