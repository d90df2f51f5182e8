//! Local store: domain tables plus sync bookkeeping (queue, conflicts, meta)

mod conflict_repository;
mod connection;
mod meta_repository;
mod migrations;
mod queue_repository;
mod record_repository;
mod write;

pub use conflict_repository::{ConflictRepository, SqliteConflictRepository};
pub use connection::Database;
pub use meta_repository::{
    MetaRepository, SqliteMetaRepository, META_LAST_DOWNLOAD_SYNC, META_LAST_UPLOAD_SYNC,
    META_SEEDED,
};
pub use queue_repository::{QueueRepository, SqliteQueueRepository};
pub use record_repository::{RecordRepository, SqliteRecordRepository};
pub use write::WritePath;

/// Parse a text column into a `FromStr` type, mapping failures onto
/// rusqlite's conversion error so row-mapping closures stay fallible.
pub(crate) fn parse_column<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
