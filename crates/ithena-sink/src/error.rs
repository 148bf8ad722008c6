//! Sink and token-provider errors.

use thiserror::Error;

/// Errors from the audit batcher, its dispatch paths, and the token provider.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Remote HTTP delivery exhausted its retries.
    #[error("remote audit delivery failed after retries: {0}")]
    RemoteDeliver(String),
    /// OS keyring access failed.
    #[error("keyring access failed: {0}")]
    Token(String),
    /// Local persistence failed.
    #[error(transparent)]
    Store(#[from] ithena_store_sqlite::StoreError),
}
