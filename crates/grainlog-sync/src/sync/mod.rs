//! Offline/online reconciliation engine: remote interface, conflict
//! resolution, upload/download processors, and the orchestrator.

mod download;
mod http;
mod memory;
mod orchestrator;
mod remote;
mod resolver;
mod upload;

pub use http::HttpRemote;
pub use memory::MemoryRemote;
pub use orchestrator::{SyncCursors, SyncOrchestrator, SyncReport};
pub use remote::{RemoteError, RemoteResult, RemoteStore};
pub use resolver::{resolve, Resolution, Winner, SERVER_WINS};

use crate::models::QueueCounts;

/// Unified sync state exposed to UI layers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// Session without a remote identity; no network activity is ever
    /// attempted
    LocalOnly,
    /// Identified but no connectivity signal
    Offline,
    /// A run is active, or pending entries remain to be drained
    Syncing,
    /// At least one queue entry is `failed` and needs user attention
    Error,
    /// Last run was clean and the queue is empty
    Synced,
}

/// Derived snapshot published to observers after every queue transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncStatus {
    pub state: SyncState,
    /// Entries pending or in progress
    pub pending: i64,
    /// Entries needing user attention
    pub failed: i64,
}

impl SyncStatus {
    /// Derive the caller-facing state from session and queue facts.
    ///
    /// A failed entry wins over everything except an active run, since
    /// failures need user attention independent of remaining pending work.
    pub(crate) const fn derive(
        identified: bool,
        online: bool,
        running: bool,
        counts: QueueCounts,
    ) -> Self {
        let state = if !identified {
            SyncState::LocalOnly
        } else if running {
            SyncState::Syncing
        } else if counts.failed > 0 {
            SyncState::Error
        } else if !online {
            SyncState::Offline
        } else if counts.active > 0 {
            SyncState::Syncing
        } else {
            SyncState::Synced
        };

        Self {
            state,
            pending: counts.active,
            failed: counts.failed,
        }
    }
}
