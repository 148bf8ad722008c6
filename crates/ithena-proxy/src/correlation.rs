//! The shared, mutex-protected request store keyed by canonicalized id.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use ithena_core::time::now_rfc3339;
use serde_json::Value;

/// A request observed on the client→child stream, awaiting correlation.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    /// The JSON-RPC `method` of the request.
    pub method: String,
    /// When the request was observed, for duration computation.
    pub start_instant: Instant,
    /// When the request was observed, RFC 3339, for the audit record.
    pub start_timestamp: String,
    /// The request `params` as observed.
    pub params: Value,
}

impl PendingRequest {
    /// Builds a pending request starting now.
    #[must_use]
    pub fn new(method: String, params: Value) -> Self {
        Self {
            method,
            start_instant: Instant::now(),
            start_timestamp: now_rfc3339(),
            params,
        }
    }
}

/// In-memory map of canonicalized JSON-RPC id to the request awaiting a
/// matching response. One mutex; critical sections are insert and
/// lookup-and-remove only.
#[derive(Clone, Default)]
pub struct RequestStore {
    inner: Arc<Mutex<HashMap<String, PendingRequest>>>,
}

impl RequestStore {
    /// Builds an empty request store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a request under `key`, overwriting any prior entry with the
    /// same canonicalized id (a client reusing an id is its own bug; we
    /// don't try to detect it).
    pub fn insert(&self, key: String, request: PendingRequest) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.insert(key, request);
        }
    }

    /// Removes and returns the pending request for `key`, if present.
    pub fn remove(&self, key: &str) -> Option<PendingRequest> {
        self.inner.lock().ok().and_then(|mut guard| guard.remove(key))
    }
}

/// Returns the elapsed milliseconds since `start`, as a non-negative value.
#[must_use]
pub fn duration_ms_since(start: Instant) -> u64 {
    u64::try_from(Instant::now().saturating_duration_since(start).as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_then_remove_round_trips() {
        let store = RequestStore::new();
        store.insert("n:1".to_string(), PendingRequest::new("tool/call".to_string(), json!({"x": 1})));
        let pending = store.remove("n:1").expect("present");
        assert_eq!(pending.method, "tool/call");
        assert!(store.remove("n:1").is_none());
    }

    #[test]
    fn remove_on_unknown_key_is_none() {
        let store = RequestStore::new();
        assert!(store.remove("missing").is_none());
    }
}
