//! Binary entry point: parses args, initializes logging, and dispatches to
//! wrap mode or the `auth`/`logs` subcommands.

mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod output;

use cli::{Cli, Commands};
use error::CliError;
use ithena_core::WrapperProfile;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = cli::parse();
    logging::init_tracing(cli.verbose);

    let result = match cli.command {
        Some(Commands::Auth { action }) => Ok(commands::auth::run(action.unwrap_or_default())),
        Some(Commands::Logs { action }) => commands::logs::run(action).await,
        None => run_wrap_mode(cli).await,
    };

    match result {
        Ok(code) => exit_code_from(code),
        Err(e) => {
            tracing::error!(error = %e, "fatal");
            exit_code_from(e.exit_code())
        }
    }
}

async fn run_wrap_mode(cli: Cli) -> Result<i32, CliError> {
    let observe_url = config::resolve_observe_url(cli.observe_url.clone());

    let profile = if let Some(name) = &cli.wrapper_profile {
        config::load_profile(name, cli.wrapper_config_file.as_deref())?
    } else if !cli.child.is_empty() {
        let mut iter = cli.child.into_iter();
        let command = iter.next().unwrap_or_default();
        let args: Vec<String> = iter.collect();
        WrapperProfile::direct(command, args, cli.alias.clone())
    } else {
        return Err(CliError::InputParse(
            "no --wrapper-profile and no direct-wrap command given after `--`".to_string(),
        ));
    };

    commands::wrap::run(profile, observe_url).await
}

fn exit_code_from(code: i32) -> std::process::ExitCode {
    let clamped = code.clamp(0, 255);
    #[allow(clippy::cast_sign_loss, reason = "clamped to 0..=255 immediately above")]
    std::process::ExitCode::from(clamped as u8)
}
