//! Audit batching, dual-sink dispatch, and the auth token provider.

pub mod error;
pub mod remote;
pub mod sink;
pub mod token;

pub use error::SinkError;
pub use sink::{AuditSink, AuditSinkProducer};
pub use token::{KeyringTokenProvider, TokenProvider};
