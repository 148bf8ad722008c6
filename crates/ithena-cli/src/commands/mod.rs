//! Command handlers. Each one is a thin shim over the core crates; no
//! business logic lives here that belongs in `ithena-proxy`, `ithena-sink`,
//! `ithena-store-sqlite`, or `ithena-api`.

pub mod auth;
pub mod logs;
pub mod wrap;
