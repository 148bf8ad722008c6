//! Placeholder resolution errors.

use thiserror::Error;

/// An error resolving one `{{ type : value }}` placeholder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    /// The placeholder body has no `type:value` separator, or a `keyring`
    /// value has no `service:account` separator.
    #[error("malformed placeholder body: {0}")]
    Malformed(String),
    /// The placeholder body has no closing `}}`.
    #[error("unterminated placeholder")]
    Unterminated,
    /// The placeholder type is not one of `env`, `keyring`, `file`.
    #[error("unknown placeholder type: {0}")]
    UnknownType(String),
    /// `{{env:NAME}}` and `NAME` is unset in the parent process environment.
    #[error("environment variable not set: {0}")]
    EnvNotFound(String),
    /// `{{keyring:service:account}}` and the OS secret store lookup failed.
    #[error("keyring lookup failed for {0}")]
    Keyring(String),
    /// `{{file:path}}` and the file could not be read.
    #[error("failed to read file {0}: {1}")]
    File(String, String),
}
