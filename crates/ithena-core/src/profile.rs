//! Wrapper profile: the immutable description of a child to spawn.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A named wrapper configuration: command, args, env, optional alias.
///
/// Immutable per invocation; `env` values may still contain unresolved
/// placeholders (see `ithena-providers`) until resolution runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrapperProfile {
    /// The executable to spawn.
    pub command: String,
    /// Arguments passed to the executable, in order.
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment variables, keyed by name; values may contain placeholders.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Optional human label used as `target_server_alias` on audit records.
    #[serde(default)]
    pub alias: Option<String>,
}

impl WrapperProfile {
    /// Builds a direct-wrap profile from a bare command line (no env, no
    /// profile file involved).
    #[must_use]
    pub fn direct(command: String, args: Vec<String>, alias: Option<String>) -> Self {
        Self {
            command,
            args,
            env: BTreeMap::new(),
            alias,
        }
    }
}
