//! Domain and sync bookkeeping models

mod conflict;
mod queue;
mod record;
mod table;

pub use conflict::SyncConflict;
pub use queue::{FailedEntrySummary, Operation, QueueCounts, QueueEntry, QueueStatus};
pub use record::{Record, RecordId};
pub use table::SyncTable;
