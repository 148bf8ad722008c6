//! Shared error type for producers of audit-pipeline primitives.

use thiserror::Error;

/// Errors surfaced by `ithena-core`'s own primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value that should have been a JSON-RPC scalar id was something
    /// else (array, object, or boolean).
    #[error("unsupported JSON-RPC id shape: {0}")]
    UnsupportedId(String),
}
