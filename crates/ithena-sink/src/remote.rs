//! Remote audit delivery: `POST <endpoint>` with bearer auth and retry.

use std::time::Duration;

use ithena_core::AuditRecord;

use crate::error::SinkError;

const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];

/// Delivers `batch` to `endpoint` with bearer auth, retrying transport
/// errors or non-2xx responses up to [`RETRY_DELAYS`]`.len()` additional
/// times with exponential backoff. Gives up after the final attempt and
/// returns the last error; there is no local fallback inside this call.
///
/// # Errors
/// Returns [`SinkError::RemoteDeliver`] once every attempt has failed.
pub async fn deliver_remote(
    client: &reqwest::Client,
    endpoint: &str,
    token: &str,
    batch: &[AuditRecord],
) -> Result<(), SinkError> {
    let mut attempt: usize = 0;
    loop {
        match send_once(client, endpoint, token, batch).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                if attempt >= RETRY_DELAYS.len() {
                    return Err(SinkError::RemoteDeliver(e));
                }
                tracing::warn!(attempt, error = %e, "remote audit delivery attempt failed, retrying");
                tokio::time::sleep(RETRY_DELAYS[attempt]).await;
                attempt += 1;
            }
        }
    }
}

async fn send_once(
    client: &reqwest::Client,
    endpoint: &str,
    token: &str,
    batch: &[AuditRecord],
) -> Result<(), String> {
    let response = client
        .post(endpoint)
        .bearer_auth(token)
        .header("Content-Type", "application/json")
        .json(batch)
        .timeout(PER_ATTEMPT_TIMEOUT)
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("non-2xx status: {}", response.status()))
    }
}
