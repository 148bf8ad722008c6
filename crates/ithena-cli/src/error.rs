//! The CLI's top-level error type and exit-code mapping.
//!
//! This is the only error type `main` ever matches on; every other crate's
//! errors are logged where they occur and translated into one of these
//! variants by the command handlers.

use thiserror::Error;

/// A wrapper-internal fatal error. Every variant maps to exit code `1`; the
/// child's own exit code is reported separately by the wrap commands and
/// never flows through this type.
#[derive(Debug, Error)]
pub enum CliError {
    /// The wrapper profile file or the named profile within it could not be
    /// parsed or found.
    #[error("{0}")]
    InputParse(String),
    /// Resolving a `{{ type : value }}` placeholder failed.
    #[error("placeholder resolution failed: {0}")]
    PlaceholderResolve(String),
    /// The local record store could not be opened.
    #[error("failed to open local record store: {0}")]
    Store(#[from] ithena_store_sqlite::StoreError),
    /// The query API server failed.
    #[error("query API error: {0}")]
    Api(#[from] ithena_api::ApiError),
}

impl CliError {
    /// The process exit code for this error: always `1`, regardless of
    /// which variant it is.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        1
    }
}
