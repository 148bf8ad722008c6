//! Stdio proxy and JSON-RPC correlator.

pub mod correlation;
pub mod error;
pub mod proxy;

pub use error::ProxyError;
pub use proxy::{run, ProxyOutcome};
