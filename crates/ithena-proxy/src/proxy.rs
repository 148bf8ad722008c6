//! Spawns the wrapped child, forwards three byte streams concurrently,
//! snoops JSON-RPC traffic on stdin/stdout, and emits one audit record per
//! correlated request/response pair.

use std::process::Stdio;

use ithena_core::jsonrpc::{canonicalize_id, JsonRpcRequest, JsonRpcResponse};
use ithena_core::{AuditRecord, WrapperProfile};
use ithena_sink::AuditSinkProducer;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

use crate::correlation::{duration_ms_since, PendingRequest, RequestStore};
use crate::error::ProxyError;

/// The wrapper's process exit code once the proxy has finished.
#[derive(Debug, Clone, Copy)]
pub struct ProxyOutcome {
    /// `0` on a clean child exit, the child's own code otherwise, or `1` on
    /// a pre-spawn or reap failure.
    pub exit_code: i32,
}

/// Runs the proxy to completion: spawns `profile.command`, forwards stdio,
/// and submits audit records to `producer` for delivery to `observe_url`.
///
/// Never returns an `Err`; spawn and wait failures are reported as
/// synthesized audit records and reflected in the returned exit code.
pub async fn run(profile: &WrapperProfile, observe_url: &str, producer: AuditSinkProducer) -> ProxyOutcome {
    let mut command = Command::new(&profile.command);
    command
        .args(&profile.args)
        .envs(&profile.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            tracing::warn!(error = %e, command = %profile.command, "failed to spawn wrapped child");
            producer.submit(
                AuditRecord::early_error(ProxyError::Spawn(e).to_string()),
                observe_url,
            );
            return ProxyOutcome { exit_code: 1 };
        }
    };

    let (Some(child_stdin), Some(child_stdout), Some(child_stderr)) =
        (child.stdin.take(), child.stdout.take(), child.stderr.take())
    else {
        tracing::warn!("child process pipes unavailable after spawn with piped stdio");
        producer.submit(
            AuditRecord::early_error(ProxyError::MissingPipe("stdin/stdout/stderr").to_string()),
            observe_url,
        );
        return ProxyOutcome { exit_code: 1 };
    };

    let request_store = RequestStore::new();
    let alias = profile.alias.clone();
    let observe_url_owned = observe_url.to_string();

    let upstream = tokio::spawn(forward_upstream(child_stdin, request_store.clone()));
    let downstream = tokio::spawn(forward_downstream(
        child_stdout,
        request_store,
        producer.clone(),
        observe_url_owned.clone(),
        alias,
    ));
    let stderr_task = tokio::spawn(forward_stderr(child_stderr));

    let _ = tokio::join!(upstream, downstream, stderr_task);

    let status = match child.wait().await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "failed to wait for wrapped child");
            producer.submit(
                AuditRecord::early_error(ProxyError::Wait(e).to_string()),
                observe_url,
            );
            return ProxyOutcome { exit_code: 1 };
        }
    };

    if !status.success() {
        producer.submit(
            AuditRecord::early_error(format!("child process exited with status: {status}")),
            observe_url,
        );
    }

    ProxyOutcome {
        exit_code: status.code().unwrap_or(1),
    }
}

/// Client stdin → child stdin, with inline request snooping.
///
/// Forwarding always precedes inspection: a line is written to the child
/// before it is parsed, so malformed or unparseable input is never blocked.
async fn forward_upstream(mut child_stdin: tokio::process::ChildStdin, request_store: RequestStore) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "error reading client stdin; stopping upstream worker");
                break;
            }
        };

        if let Err(e) = child_stdin.write_all(line.as_bytes()).await {
            tracing::debug!(error = %e, "write error on child stdin; stopping upstream worker");
            break;
        }
        if let Err(e) = child_stdin.write_all(b"\n").await {
            tracing::debug!(error = %e, "write error on child stdin; stopping upstream worker");
            break;
        }

        match serde_json::from_str::<JsonRpcRequest>(&line) {
            Ok(request) => {
                if let Some(id) = &request.id {
                    if let Some(key) = canonicalize_id(id) {
                        request_store.insert(
                            key,
                            PendingRequest::new(request.method.clone(), request.params.unwrap_or(Value::Null)),
                        );
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "malformed JSON-RPC on client stdin; bytes still forwarded");
            }
        }
    }
}

/// Child stdout → client stdout, with inline response snooping and
/// correlation against the request store.
async fn forward_downstream(
    child_stdout: tokio::process::ChildStdout,
    request_store: RequestStore,
    producer: AuditSinkProducer,
    observe_url: String,
    alias: Option<String>,
) {
    let mut lines = BufReader::new(child_stdout).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "error reading child stdout; stopping downstream worker");
                break;
            }
        };

        if let Err(e) = stdout.write_all(line.as_bytes()).await {
            tracing::debug!(error = %e, "write error on own stdout; stopping downstream worker");
            break;
        }
        if let Err(e) = stdout.write_all(b"\n").await {
            tracing::debug!(error = %e, "write error on own stdout; stopping downstream worker");
            break;
        }
        if let Err(e) = stdout.flush().await {
            tracing::debug!(error = %e, "flush error on own stdout; stopping downstream worker");
            break;
        }

        match serde_json::from_str::<JsonRpcResponse>(&line) {
            Ok(response) => {
                correlate_and_emit(response, &request_store, &producer, &observe_url, alias.as_deref());
            }
            Err(e) => {
                tracing::debug!(error = %e, "malformed JSON-RPC on child stdout; bytes still forwarded");
            }
        }
    }
}

fn correlate_and_emit(
    response: JsonRpcResponse,
    request_store: &RequestStore,
    producer: &AuditSinkProducer,
    observe_url: &str,
    alias: Option<&str>,
) {
    let Some(id) = &response.id else {
        return;
    };
    let Some(key) = canonicalize_id(id) else {
        return;
    };
    let Some(pending) = request_store.remove(&key) else {
        tracing::warn!(id = %key, "correlation miss: response id not found in request store");
        return;
    };

    let duration_ms = duration_ms_since(pending.start_instant);
    let tool_name = extract_tool_name(&pending.method, &pending.params);

    let mut record = match response.error {
        Some(error) => AuditRecord::failure(Some(pending.method), tool_name, duration_ms, pending.params, error),
        None => AuditRecord::success(
            Some(pending.method),
            tool_name,
            duration_ms,
            pending.params,
            response.result.unwrap_or(Value::Null),
        ),
    };
    record.timestamp = Some(pending.start_timestamp);
    record.target_server_alias = alias.map(str::to_string);

    producer.submit(record, observe_url);
}

fn extract_tool_name(method: &str, params: &Value) -> Option<String> {
    if method == "tool/call" {
        params.get("tool_name").and_then(Value::as_str).map(str::to_string)
    } else {
        None
    }
}

/// Byte-for-byte copy of the child's stderr onto the wrapper's own stderr.
async fn forward_stderr(mut child_stderr: tokio::process::ChildStderr) {
    let mut stderr = tokio::io::stderr();
    if let Err(e) = tokio::io::copy(&mut child_stderr, &mut stderr).await {
        tracing::debug!(error = %e, "error copying child stderr");
    }
}
