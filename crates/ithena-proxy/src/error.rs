//! Proxy errors.

use thiserror::Error;

/// Errors from spawning or reaping the wrapped child process.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The child could not be spawned (executable missing, permissions, …).
    #[error("failed to spawn child process: {0}")]
    Spawn(std::io::Error),
    /// The child's stdio pipes were not available after spawn with piped IO.
    #[error("child process pipe unavailable: {0}")]
    MissingPipe(&'static str),
    /// Waiting for the child to exit failed.
    #[error("failed to wait for child process: {0}")]
    Wait(std::io::Error),
}
