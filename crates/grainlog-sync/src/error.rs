//! Error types for grainlog-sync

use thiserror::Error;

/// Result type alias using grainlog-sync's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in grainlog-sync operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local store error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Table name outside the synchronizable set
    #[error("Unknown sync table: {0}")]
    UnknownTable(String),

    /// Remote store error
    #[error("Remote error: {0}")]
    Remote(#[from] crate::sync::RemoteError),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
