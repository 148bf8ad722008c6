//! `logs show [--port <n>]` and `logs clear`.

use std::sync::Arc;

use ithena_api::ApiConfig;
use ithena_sink::{KeyringTokenProvider, TokenProvider};
use ithena_store_sqlite::LogStore;

use crate::cli::LogsAction;
use crate::error::CliError;
use crate::output::{print_line, prompt_yes_no};

/// Runs the requested logs action.
///
/// # Errors
/// Returns [`CliError::Store`] if the local record store could not be
/// opened, or [`CliError::Api`] if the query API server failed to bind or
/// run.
pub async fn run(action: LogsAction) -> Result<i32, CliError> {
    match action {
        LogsAction::Show { port } => show(port).await,
        LogsAction::Clear => clear(),
    }
}

async fn show(port: Option<u16>) -> Result<i32, CliError> {
    let store = Arc::new(LogStore::open(&ithena_store_sqlite::default_db_path())?);
    let token_provider: Arc<dyn TokenProvider> = Arc::new(KeyringTokenProvider);
    let mut config = ApiConfig::default();
    if let Some(port) = port {
        config.port = port;
    }

    ithena_api::serve(config, store, token_provider).await?;
    Ok(0)
}

fn clear() -> Result<i32, CliError> {
    if !prompt_yes_no("Delete the local audit log database?") {
        print_line("aborted");
        return Ok(0);
    }
    let store = LogStore::open(&ithena_store_sqlite::default_db_path())?;
    store.clear()?;
    print_line("local log database cleared");
    Ok(0)
}
