//! Tracing initialization. All diagnostics go to stderr: stdout is the
//! proxied child's output stream and must never carry log lines.

/// Initializes the global tracing subscriber. `verbose` selects `debug`
/// level; otherwise `info`. `RUST_LOG`, if set, takes precedence.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
