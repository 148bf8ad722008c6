//! Black-box CLI smoke tests driving the built binary with `assert_cmd`.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn version_flag_reports_crate_version() {
    let mut cmd = Command::cargo_bin("ithena-cli").expect("binary built");
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn direct_wrap_forwards_stdin_to_stdout_via_cat() {
    let mut cmd = Command::cargo_bin("ithena-cli").expect("binary built");
    let line = r#"{"jsonrpc":"2.0","id":7,"method":"tool/call","params":{"tool_name":"echo","x":1}}"#;
    cmd.args(["--", "cat"])
        .write_stdin(format!("{line}\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tool_name\":\"echo\""));
}

#[test]
fn missing_profile_and_missing_command_is_exit_code_one() {
    let mut cmd = Command::cargo_bin("ithena-cli").expect("binary built");
    cmd.assert().failure().code(1);
}

#[test]
fn auth_status_without_token_reports_not_authenticated() {
    let mut cmd = Command::cargo_bin("ithena-cli").expect("binary built");
    cmd.args(["auth", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not authenticated").or(predicate::str::contains("authenticated")));
}
