//! Embedded SQL persistence for audit records.

pub mod error;
pub mod store;

pub use error::StoreError;
pub use store::{default_db_path, LogStore, QueryFilter, QueryResult, SCHEMA_VERSION};
