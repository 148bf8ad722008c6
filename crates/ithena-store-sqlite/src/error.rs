//! Record store errors.

use thiserror::Error;

/// Errors from opening, migrating, or querying the local record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Failed to create the parent directory of the database file.
    #[error("failed to create database directory {0}: {1}")]
    CreateDir(String, std::io::Error),
    /// The on-disk schema version is newer than this binary understands.
    #[error("database schema version {found} is newer than supported version {expected}")]
    VersionMismatch {
        /// The version found in the database.
        found: i64,
        /// The newest version this binary supports.
        expected: i64,
    },
    /// The connection mutex was poisoned by a prior panicking holder.
    #[error("store connection lock poisoned")]
    Poisoned,
    /// Underlying SQLite error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to remove the database file during `clear`.
    #[error("failed to remove database file {0}: {1}")]
    RemoveFile(String, std::io::Error),
}
