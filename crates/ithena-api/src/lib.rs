//! Paginated, filterable HTTP query API over the local audit record store.

pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{serve, ApiConfig, DEFAULT_PORT};
