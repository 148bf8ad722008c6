//! Argument parsing. Kept thin and declarative: it builds a [`Cli`] value
//! and hands it to the command handlers in `commands/`; no core logic lives
//! here.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// `<version> (<commit>, <build-date>)`, with `commit`/`build-date` falling
/// back to `"unknown"` when a build script hasn't injected them.
fn version_string() -> String {
    format!(
        "{} ({}, {})",
        env!("CARGO_PKG_VERSION"),
        option_env!("ITHENA_BUILD_COMMIT").unwrap_or("unknown"),
        option_env!("ITHENA_BUILD_DATE").unwrap_or("unknown"),
    )
}

/// A local observability wrapper for JSON-RPC 2.0 stdio MCP servers.
#[derive(Debug, Parser)]
#[command(name = "ithena-cli", version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Auth or logs subcommand; absent means wrap mode.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Named profile to load from the wrapper config file (profile mode).
    #[arg(long)]
    pub wrapper_profile: Option<String>,

    /// Explicit wrapper config file path, overriding the default search.
    #[arg(long)]
    pub wrapper_config_file: Option<PathBuf>,

    /// Remote audit ingestion endpoint; overrides any profile default.
    #[arg(long)]
    pub observe_url: Option<String>,

    /// Human label for the wrapped server (direct-wrap mode only).
    #[arg(long)]
    pub alias: Option<String>,

    /// Enable verbose (debug-level) logging.
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Direct-wrap mode: everything after `--` is the child command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub child: Vec<String>,
}

/// Top-level subcommands, outside of the default wrap mode.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Auth subcommand surface.
    Auth {
        /// Defaults to `login` when omitted.
        #[command(subcommand)]
        action: Option<AuthAction>,
    },
    /// Query-API lifecycle: `logs show` serves the API, `logs clear` wipes
    /// the local store.
    Logs {
        #[command(subcommand)]
        action: LogsAction,
    },
}

/// `auth` subcommand actions.
#[derive(Debug, Subcommand, Default)]
pub enum AuthAction {
    /// Starts the OAuth device-authorization login flow (handled by a
    /// separate external flow, not by this command directly).
    #[default]
    Login,
    /// Reports whether a token is currently stored.
    Status,
    /// Removes the stored token.
    Deauth,
    /// Alias for `deauth`.
    Logout,
}

/// `logs` subcommand actions.
#[derive(Debug, Subcommand)]
pub enum LogsAction {
    /// Starts the query API server.
    Show {
        /// Port to bind on `localhost`; defaults to 8675.
        #[arg(long)]
        port: Option<u16>,
    },
    /// Deletes the local record store after an interactive `y/N` confirm.
    Clear,
}

/// Parses `std::env::args()` into a [`Cli`].
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
