//! Shared types for the ithena-cli observability wrapper.
//!
//! This crate defines the canonical [`audit::AuditRecord`], the JSON-RPC
//! envelope shapes the proxy snoops, and the [`profile::WrapperProfile`]
//! configuration type. It has no knowledge of stdio, sockets, or SQL; those
//! live in `ithena-proxy`, `ithena-api`, and `ithena-store-sqlite`
//! respectively.

pub mod audit;
pub mod error;
pub mod jsonrpc;
pub mod profile;
pub mod time;

pub use audit::{AuditRecord, AuditStatus};
pub use error::CoreError;
pub use jsonrpc::{canonicalize_id, JsonRpcRequest, JsonRpcResponse};
pub use profile::WrapperProfile;

/// The crate version, used as the default `proxy_version` on audit records
/// and echoed by `GET /api/version`.
pub const PROXY_VERSION: &str = env!("CARGO_PKG_VERSION");
