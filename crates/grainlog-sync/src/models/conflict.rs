//! Sync conflict model

use crate::models::SyncTable;
use serde::{Deserialize, Serialize};

/// Recorded sync conflict, appended whenever a merge discards a local or
/// remote value. Never mutated; pruned in bulk past a retention horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// Conflict row identifier
    pub id: i64,
    /// Table involved in the conflict
    pub table: SyncTable,
    /// Entity whose local edit lost
    pub entity_id: String,
    /// Resolution policy name (currently always `server_wins`)
    pub resolved_by: String,
    /// Resolution timestamp (Unix ms)
    pub created_at: i64,
}
