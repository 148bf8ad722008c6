//! `auth [login|status|deauth|logout]`.
//!
//! The login flow itself runs as a separate OAuth device-authorization
//! flow; this handler only drives the retrieve/delete token contract.

use ithena_sink::{KeyringTokenProvider, TokenProvider};

use crate::cli::AuthAction;
use crate::output::print_line;

/// Runs the requested auth action and returns the process exit code.
pub fn run(action: AuthAction) -> i32 {
    let token_provider = KeyringTokenProvider;
    match action {
        AuthAction::Login => {
            print_line("Login is handled by a separate OAuth device-authorization flow, not by this build.");
            0
        }
        AuthAction::Status => {
            match token_provider.current_token() {
                Some(token) if !token.is_empty() => print_line("authenticated"),
                _ => print_line("not authenticated"),
            }
            0
        }
        AuthAction::Deauth | AuthAction::Logout => match token_provider.delete_token() {
            Ok(()) => {
                print_line("token removed");
                0
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to remove auth token");
                1
            }
        },
    }
}
