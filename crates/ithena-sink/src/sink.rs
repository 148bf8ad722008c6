//! Audit batcher and dual-sink dispatcher: `Idle -> Buffering -> Flushing ->
//! Idle`, flushing on size or age, choosing remote vs. local at flush time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ithena_core::AuditRecord;
use ithena_store_sqlite::LogStore;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::remote;
use crate::token::TokenProvider;

/// Records accumulate until this many are buffered, then flush.
const BATCH_SIZE: usize = 20;
/// Records older than this (relative to last flush) trigger a flush.
const BATCH_INTERVAL: Duration = Duration::from_secs(15);
/// The sink wakes at half the batch interval to check buffer age.
const TICK_INTERVAL: Duration = Duration::from_millis(7_500);
/// Producers never block; the queue drops records past this depth.
const QUEUE_DEPTH: usize = 100;

enum SinkMessage {
    Record(AuditRecord, String),
}

/// The producer-facing half of the sink: cheap to clone, non-blocking.
#[derive(Clone)]
pub struct AuditSinkProducer {
    sender: mpsc::Sender<SinkMessage>,
}

impl AuditSinkProducer {
    /// Submits `record` for delivery to `endpoint`.
    ///
    /// Non-blocking: if the queue is full, the record is dropped and a
    /// warning is logged. Producers must never stall on the audit pipeline.
    pub fn submit(&self, record: AuditRecord, endpoint: &str) {
        match self.sender.try_send(SinkMessage::Record(record, endpoint.to_string())) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("audit queue full at depth {QUEUE_DEPTH}; dropping record");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("audit sink already shut down; dropping record");
            }
        }
    }
}

/// Owns the background batching worker and the channel that feeds it.
pub struct AuditSink {
    producer: AuditSinkProducer,
    worker: JoinHandle<()>,
}

impl AuditSink {
    /// Spawns the batching worker.
    #[must_use]
    pub fn spawn(
        proxy_version: String,
        token_provider: Arc<dyn TokenProvider>,
        store: Arc<LogStore>,
        http_client: reqwest::Client,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(QUEUE_DEPTH);
        let worker = tokio::spawn(run_worker(receiver, proxy_version, token_provider, store, http_client));
        Self {
            producer: AuditSinkProducer { sender },
            worker,
        }
    }

    /// Returns a cloneable producer handle.
    #[must_use]
    pub fn producer(&self) -> AuditSinkProducer {
        self.producer.clone()
    }

    /// Signals the worker to drain and perform a final synchronous flush,
    /// then waits for it to finish.
    pub async fn shutdown(self) {
        drop(self.producer);
        if let Err(e) = self.worker.await {
            tracing::warn!(error = %e, "audit sink worker task panicked during shutdown");
        }
    }
}

struct Worker {
    buffer: Vec<AuditRecord>,
    current_endpoint: Option<String>,
    last_flush: Instant,
    proxy_version: String,
    token_provider: Arc<dyn TokenProvider>,
    store: Arc<LogStore>,
    http_client: reqwest::Client,
    local_banner_shown: Arc<AtomicBool>,
}

async fn run_worker(
    mut receiver: mpsc::Receiver<SinkMessage>,
    proxy_version: String,
    token_provider: Arc<dyn TokenProvider>,
    store: Arc<LogStore>,
    http_client: reqwest::Client,
) {
    let mut worker = Worker {
        buffer: Vec::new(),
        current_endpoint: None,
        last_flush: Instant::now(),
        proxy_version,
        token_provider,
        store,
        http_client,
        local_banner_shown: Arc::new(AtomicBool::new(false)),
    };
    let mut ticker = tokio::time::interval(TICK_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            received = receiver.recv() => {
                match received {
                    Some(SinkMessage::Record(mut record, endpoint)) => {
                        if worker.current_endpoint.as_deref().is_some_and(|cur| cur != endpoint)
                            && !worker.buffer.is_empty()
                        {
                            worker.flush_async();
                        }
                        worker.current_endpoint = Some(endpoint);
                        record.ensure_defaults(&worker.proxy_version);
                        worker.buffer.push(record);
                        if worker.buffer.len() >= BATCH_SIZE {
                            worker.flush_async();
                        }
                    }
                    None => {
                        worker.flush_sync().await;
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if !worker.buffer.is_empty() && worker.last_flush.elapsed() >= BATCH_INTERVAL {
                    worker.flush_async();
                }
            }
        }
    }
}

impl Worker {
    fn snapshot(&mut self) -> Option<(String, Vec<AuditRecord>)> {
        if self.buffer.is_empty() {
            return None;
        }
        let endpoint = self.current_endpoint.clone().unwrap_or_default();
        let batch = std::mem::take(&mut self.buffer);
        self.last_flush = Instant::now();
        Some((endpoint, batch))
    }

    /// Flushes via a detached task; used for size/age-triggered flushes so
    /// the worker keeps draining its queue while dispatch is in flight.
    fn flush_async(&mut self) {
        let Some((endpoint, batch)) = self.snapshot() else {
            return;
        };
        let token_provider = Arc::clone(&self.token_provider);
        let store = Arc::clone(&self.store);
        let client = self.http_client.clone();
        let banner = Arc::clone(&self.local_banner_shown);
        tokio::spawn(async move {
            dispatch_batch(token_provider, store, client, endpoint, batch, banner).await;
        });
    }

    /// Flushes and awaits completion in place; used only at shutdown so the
    /// final batch is guaranteed settled before the process exits.
    async fn flush_sync(&mut self) {
        let Some((endpoint, batch)) = self.snapshot() else {
            return;
        };
        dispatch_batch(
            Arc::clone(&self.token_provider),
            Arc::clone(&self.store),
            self.http_client.clone(),
            endpoint,
            batch,
            Arc::clone(&self.local_banner_shown),
        )
        .await;
    }
}

async fn dispatch_batch(
    token_provider: Arc<dyn TokenProvider>,
    store: Arc<LogStore>,
    client: reqwest::Client,
    endpoint: String,
    batch: Vec<AuditRecord>,
    local_banner_shown: Arc<AtomicBool>,
) {
    if batch.is_empty() {
        return;
    }
    match token_provider.current_token() {
        Some(token) if !token.is_empty() => {
            if let Err(e) = remote::deliver_remote(&client, &endpoint, &token, &batch).await {
                tracing::warn!(error = %e, batch_len = batch.len(), "remote audit delivery exhausted retries; batch dropped");
            }
        }
        _ => persist_locally(store, batch, local_banner_shown).await,
    }
}

async fn persist_locally(store: Arc<LogStore>, batch: Vec<AuditRecord>, local_banner_shown: Arc<AtomicBool>) {
    if !local_banner_shown.swap(true, Ordering::Relaxed) {
        tracing::info!("no auth token present; audit records are being stored in the local database");
    }
    let first_id = batch.first().and_then(|r| r.id.clone());
    match tokio::task::spawn_blocking(move || store.insert_batch(&batch)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(error = %e, first_id = ?first_id, "local persist failed; batch lost");
        }
        Err(join_err) => {
            tracing::warn!(error = %join_err, first_id = ?first_id, "local persist task panicked; batch lost");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::testing::FakeTokenProvider;
    use ithena_store_sqlite::QueryFilter;
    use serde_json::json;

    fn test_store() -> (tempfile::TempDir, Arc<LogStore>) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LogStore::open(&dir.path().join("logs.db")).expect("open store");
        (dir, Arc::new(store))
    }

    #[tokio::test]
    async fn flush_on_shutdown_persists_locally_without_token() {
        let (_dir, store) = test_store();
        let sink = AuditSink::spawn(
            "0.1.0".to_string(),
            Arc::new(FakeTokenProvider::empty()),
            Arc::clone(&store),
            reqwest::Client::new(),
        );
        let producer = sink.producer();
        for i in 0..3 {
            let record = AuditRecord::success(None, None, i, json!(null), json!(null));
            producer.submit(record, "http://example.invalid/ingest");
        }
        sink.shutdown().await;

        let result = store.query(&QueryFilter::default()).expect("query");
        assert_eq!(result.total_count, 3);
    }

    #[tokio::test]
    async fn size_triggered_flush_persists_before_shutdown() {
        let (_dir, store) = test_store();
        let sink = AuditSink::spawn(
            "0.1.0".to_string(),
            Arc::new(FakeTokenProvider::empty()),
            Arc::clone(&store),
            reqwest::Client::new(),
        );
        let producer = sink.producer();
        for i in 0..(BATCH_SIZE as u64) {
            producer.submit(
                AuditRecord::success(None, None, i, json!(null), json!(null)),
                "http://example.invalid/ingest",
            );
        }
        // Give the detached flush task a moment to land before we check.
        tokio::time::sleep(Duration::from_millis(200)).await;
        sink.shutdown().await;

        let result = store.query(&QueryFilter::default()).expect("query");
        assert_eq!(result.total_count, BATCH_SIZE as u64);
    }
}
