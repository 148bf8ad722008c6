//! The canonical audit record and its lifecycle helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::now_rfc3339;

/// Outcome of a correlated RPC interaction, or of an early wrapper error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    /// The response carried no JSON-RPC `error` object.
    Success,
    /// The response carried a JSON-RPC `error` object, or no response was
    /// ever observed (a synthesized early-error record).
    Failure,
}

/// The structured unit of observability emitted per correlated RPC, or per
/// early wrapper error.
///
/// # Invariants
/// Exactly one of `response_preview` and `error_details` is populated once
/// the record leaves the sink; `id`, `timestamp`, and `status` are always
/// populated before that point; `duration_ms`, when present, is non-negative
/// (the type itself already forbids negative values).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique identifier, a UUIDv4 string. Filled by the sink if absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Request start time, RFC 3339 with nanosecond precision, UTC. Filled
    /// by the sink if absent.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// The JSON-RPC `method` observed on the request side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp_method: Option<String>,
    /// Extracted from request `params.tool_name` when `mcp_method ==
    /// "tool/call"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Milliseconds between request dispatch and matching response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Whether the interaction succeeded.
    pub status: AuditStatus,
    /// Set by the sink at enqueue time if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_version: Option<String>,
    /// Human label for the wrapped server, from configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_server_alias: Option<String>,
    /// The request params as observed.
    pub request_preview: Value,
    /// The response result; present only on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_preview: Option<Value>,
    /// The response error object, or a synthesized failure description;
    /// present only on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<Value>,
}

impl AuditRecord {
    /// Builds a record for a successfully correlated RPC.
    #[must_use]
    pub fn success(
        mcp_method: Option<String>,
        tool_name: Option<String>,
        duration_ms: u64,
        request_preview: Value,
        response_preview: Value,
    ) -> Self {
        Self {
            id: None,
            timestamp: None,
            mcp_method,
            tool_name,
            duration_ms: Some(duration_ms),
            status: AuditStatus::Success,
            proxy_version: None,
            target_server_alias: None,
            request_preview,
            response_preview: Some(response_preview),
            error_details: None,
        }
    }

    /// Builds a record for a correlated RPC that returned a JSON-RPC error.
    #[must_use]
    pub fn failure(
        mcp_method: Option<String>,
        tool_name: Option<String>,
        duration_ms: u64,
        request_preview: Value,
        error_details: Value,
    ) -> Self {
        Self {
            id: None,
            timestamp: None,
            mcp_method,
            tool_name,
            duration_ms: Some(duration_ms),
            status: AuditStatus::Failure,
            proxy_version: None,
            target_server_alias: None,
            request_preview,
            response_preview: None,
            error_details: Some(error_details),
        }
    }

    /// Builds a synthesized record for a wrapper-internal error that occurs
    /// before any RPC could be observed (e.g. spawn failure, non-zero child
    /// exit). No correlation id is ever available for this case, so this
    /// type carries no correlation-id field at all.
    #[must_use]
    pub fn early_error(message: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: None,
            mcp_method: None,
            tool_name: None,
            duration_ms: None,
            status: AuditStatus::Failure,
            proxy_version: None,
            target_server_alias: None,
            request_preview: Value::Null,
            response_preview: None,
            error_details: Some(serde_json::json!({ "error": message.into() })),
        }
    }

    /// Fills `id`, `timestamp`, and `proxy_version` if absent, as the sink
    /// does at enqueue time.
    pub fn ensure_defaults(&mut self, proxy_version: &str) {
        if self.id.is_none() {
            self.id = Some(uuid::Uuid::new_v4().to_string());
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(now_rfc3339());
        }
        if self.proxy_version.is_none() {
            self.proxy_version = Some(proxy_version.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ensure_defaults_fills_only_missing_fields() {
        let mut record = AuditRecord::success(None, None, 5, json!({}), json!({}));
        record.target_server_alias = Some("kept".to_string());
        record.ensure_defaults("1.2.3");
        assert!(record.id.is_some());
        assert!(record.timestamp.is_some());
        assert_eq!(record.proxy_version.as_deref(), Some("1.2.3"));
        assert_eq!(record.target_server_alias.as_deref(), Some("kept"));
    }

    #[test]
    fn success_and_failure_populate_exactly_one_preview_field() {
        let ok = AuditRecord::success(None, None, 0, json!(null), json!({"ok": true}));
        assert!(ok.response_preview.is_some());
        assert!(ok.error_details.is_none());

        let err = AuditRecord::failure(None, None, 0, json!(null), json!({"code": -1}));
        assert!(err.response_preview.is_none());
        assert!(err.error_details.is_some());
    }
}
