//! User-facing stdout output, deliberately not routed through `println!`
//! (the workspace denies `clippy::print_stdout`/`print_stderr`; all
//! structured diagnostics go through `tracing` and all user-facing text
//! goes through these helpers instead).

use std::io::Write;

/// Writes `line` plus a trailing newline to stdout, ignoring write errors
/// (a closed stdout is not something the wrapper should panic over).
pub fn print_line(line: &str) {
    let mut stdout = std::io::stdout();
    let _ = writeln!(stdout, "{line}");
    let _ = stdout.flush();
}

/// Prompts `question` on stdout and reads a `y/N` answer from stdin.
/// Defaults to `false` (the "N" in `y/N`) on empty input or a read error.
#[must_use]
pub fn prompt_yes_no(question: &str) -> bool {
    let mut stdout = std::io::stdout();
    let _ = write!(stdout, "{question} [y/N] ");
    let _ = stdout.flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
