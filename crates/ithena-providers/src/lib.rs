//! Typed placeholder resolution for wrapper profile environment maps.

pub mod error;
pub mod resolver;

pub use error::PlaceholderError;
pub use resolver::{resolve_env, resolve_value, ResolvedEnv};
