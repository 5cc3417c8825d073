//! Error types for the brewsync engine.

use thiserror::Error;

/// All possible errors from the brewsync engine.
///
/// Degraded input (missing files, prose notes, unknown ingredient types)
/// is never reported through this type; it is logged and worked around.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Parse errors
    #[error("malformed export: {0}")]
    MalformedExport(String),

    #[error("recipe in folder '{folder}' has no name")]
    MissingRecipeName { folder: String },

    #[error("invalid archive entry: {0}")]
    InvalidArchiveEntry(String),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    // Collaborator errors
    #[error("store error: {0}")]
    Store(String),

    #[error("cursor error: {0}")]
    Cursor(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
