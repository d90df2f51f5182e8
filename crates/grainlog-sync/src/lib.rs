//! grainlog-sync - Offline/online reconciliation engine for Grainlog
//!
//! Lets a Grainlog client operate fully offline against a local `SQLite`
//! store while eventually reconciling with a shared server-side store.
//! Local writes go through an atomic write path that updates the domain
//! row and coalesces a replication intent into the mutation queue; the
//! orchestrator opportunistically drains the queue (upload) and pulls
//! remote changes since a saved cursor (download), resolving conflicts
//! deterministically with a server-wins policy and an audit trail.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{Operation, QueueEntry, QueueStatus, Record, RecordId, SyncTable};
pub use sync::{SyncOrchestrator, SyncState, SyncStatus};
