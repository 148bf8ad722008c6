//! Query API errors.

use thiserror::Error;

/// Errors from building or running the query API server.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Failed to bind the configured address.
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    /// The underlying record store reported an error.
    #[error(transparent)]
    Store(#[from] ithena_store_sqlite::StoreError),
}
