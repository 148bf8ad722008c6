//! Wrap mode: resolve placeholders, spawn the audit pipeline, run the proxy.

use std::sync::Arc;

use ithena_core::WrapperProfile;
use ithena_sink::{AuditSink, KeyringTokenProvider, TokenProvider};
use ithena_store_sqlite::LogStore;

use crate::error::CliError;

/// Runs one wrap-mode invocation to completion and returns the child's own
/// exit code on a normal run.
///
/// # Errors
/// Returns [`CliError::PlaceholderResolve`] if a `{{ type : value }}`
/// placeholder in the profile's env map failed to resolve, or
/// [`CliError::Store`] if the local record store could not be opened. No
/// child process is ever spawned in either case.
pub async fn run(profile: WrapperProfile, observe_url: String) -> Result<i32, CliError> {
    let resolved = ithena_providers::resolve_env(&profile.env);
    if let Some(err) = resolved.error {
        return Err(CliError::PlaceholderResolve(err.to_string()));
    }
    let mut profile = profile;
    profile.env = resolved.values;

    let store = Arc::new(LogStore::open(&ithena_store_sqlite::default_db_path())?);
    let token_provider: Arc<dyn TokenProvider> = Arc::new(KeyringTokenProvider);
    let http_client = reqwest::Client::new();

    let sink = AuditSink::spawn(ithena_core::PROXY_VERSION.to_string(), token_provider, store, http_client);
    let producer = sink.producer();

    let outcome = ithena_proxy::run(&profile, &observe_url, producer).await;
    sink.shutdown().await;
    Ok(outcome.exit_code)
}
