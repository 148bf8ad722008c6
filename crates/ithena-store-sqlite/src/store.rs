//! Schema v1 embedded record store: init, versioned schema, batch insert,
//! filter+paginate query, point lookup, clear.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ithena_core::{AuditRecord, AuditStatus};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;

use crate::error::StoreError;

/// The current on-disk schema version.
pub const SCHEMA_VERSION: i64 = 1;

/// Default page size for [`LogStore::query`] when the caller passes `0`.
const DEFAULT_LIMIT: u32 = 20;

/// Returns the default database path, `<user_config_dir>/ithena-cli/local_logs.v1.db`.
///
/// Falls back to `./ithena-cli/local_logs.v1.db` if the platform config
/// directory cannot be determined.
#[must_use]
pub fn default_db_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("ithena-cli").join("local_logs.v1.db")
}

/// Filters and pagination for [`LogStore::query`].
#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
    /// Restrict to records with this status.
    pub status: Option<AuditStatus>,
    /// Restrict to records with this exact tool name.
    pub tool_name: Option<String>,
    /// Restrict to records with this exact MCP method.
    pub mcp_method: Option<String>,
    /// Substring match against `id`, `request_preview`, `response_preview`,
    /// or `error_details`.
    pub search_term: Option<String>,
    /// 1-based page number; clamped to `1` if `0`.
    pub page: u32,
    /// Page size; clamped to [`DEFAULT_LIMIT`] if `0`.
    pub limit: u32,
}

/// A page of query results.
#[derive(Debug, Clone)]
pub struct QueryResult {
    /// Matching records, ordered by `timestamp DESC`.
    pub logs: Vec<AuditRecord>,
    /// Total matching rows across all pages (filters applied, pagination
    /// ignored).
    pub total_count: u64,
    /// The page number actually used (after clamping).
    pub page: u32,
    /// The page size actually used (after clamping).
    pub limit: u32,
}

/// Embedded audit-record store backed by a single shared SQLite connection.
pub struct LogStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl LogStore {
    /// Opens (creating if absent) the database at `path`, ensuring parent
    /// directories exist, applying pragmas, and running schema init/migration.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the parent directory cannot be created, the
    /// connection cannot be opened, or the on-disk schema is newer than
    /// [`SCHEMA_VERSION`].
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all_0755(parent)
                    .map_err(|e| StoreError::CreateDir(parent.display().to_string(), e))?;
            }
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;
        apply_pragmas(&conn)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: path.to_path_buf(),
        })
    }

    /// Inserts every record in `records` inside a single transaction.
    ///
    /// JSON-valued columns are serialized defensively: if serialization
    /// fails for a field, the literal string `null` is stored and a warning
    /// logged, but the row is not skipped. Any other error aborts the whole
    /// batch (the transaction is rolled back).
    ///
    /// # Errors
    /// Returns [`StoreError`] on lock poisoning or any SQLite error.
    pub fn insert_batch(&self, records: &[AuditRecord]) -> Result<(), StoreError> {
        let mut guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let tx = guard.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO logs (
                    id, timestamp, mcp_method, tool_name, duration_ms, status,
                    proxy_version, target_server_alias,
                    request_preview, response_preview, error_details
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for record in records {
                let status = match record.status {
                    AuditStatus::Success => "success",
                    AuditStatus::Failure => "failure",
                };
                let request_preview = serialize_defensive(&record.request_preview, "request_preview");
                let response_preview = record
                    .response_preview
                    .as_ref()
                    .map(|v| serialize_defensive(v, "response_preview"));
                let error_details = record
                    .error_details
                    .as_ref()
                    .map(|v| serialize_defensive(v, "error_details"));
                let duration_ms = record.duration_ms.map(|d| i64::try_from(d).unwrap_or(i64::MAX));
                stmt.execute(params![
                    record.id,
                    record.timestamp,
                    record.mcp_method,
                    record.tool_name,
                    duration_ms,
                    status,
                    record.proxy_version,
                    record.target_server_alias,
                    request_preview,
                    response_preview,
                    error_details,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns a filtered, paginated page of records ordered by
    /// `timestamp DESC`, plus the total count across all pages for the same
    /// filters.
    ///
    /// # Errors
    /// Returns [`StoreError`] on lock poisoning or any SQLite error.
    pub fn query(&self, filter: &QueryFilter) -> Result<QueryResult, StoreError> {
        let page = filter.page.max(1);
        let limit = if filter.limit == 0 { DEFAULT_LIMIT } else { filter.limit };
        let offset = u64::from(page - 1) * u64::from(limit);

        let (where_clause, values) = build_where_clause(filter);
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

        let count_sql = format!("SELECT COUNT(*) FROM logs {where_clause}");
        let total_count: i64 = guard.query_row(&count_sql, rusqlite::params_from_iter(values.iter()), |row| row.get(0))?;

        let select_sql = format!(
            "SELECT id, timestamp, mcp_method, tool_name, duration_ms, status,
                    proxy_version, target_server_alias,
                    request_preview, response_preview, error_details
             FROM logs {where_clause}
             ORDER BY timestamp DESC
             LIMIT ?{} OFFSET ?{}",
            values.len() + 1,
            values.len() + 2,
        );
        let mut stmt = guard.prepare(&select_sql)?;
        let mut all_params: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
        let limit_i64 = i64::from(limit);
        let offset_i64 = i64::try_from(offset).unwrap_or(i64::MAX);
        all_params.push(&limit_i64);
        all_params.push(&offset_i64);

        let rows = stmt.query_map(rusqlite::params_from_iter(all_params.into_iter()), row_to_record)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }

        Ok(QueryResult {
            logs,
            total_count: u64::try_from(total_count).unwrap_or(0),
            page,
            limit,
        })
    }

    /// Returns the record with `id`, or `None` if not present. Absence is
    /// not an error.
    ///
    /// # Errors
    /// Returns [`StoreError`] on lock poisoning or any SQLite error.
    pub fn get_by_id(&self, id: &str) -> Result<Option<AuditRecord>, StoreError> {
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        guard
            .query_row(
                "SELECT id, timestamp, mcp_method, tool_name, duration_ms, status,
                        proxy_version, target_server_alias,
                        request_preview, response_preview, error_details
                 FROM logs WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()
            .map_err(StoreError::from)
    }

    /// Closes the connection (best-effort) and deletes the database file.
    /// A missing file is success, not an error.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the file exists but cannot be removed.
    pub fn clear(self) -> Result<(), StoreError> {
        drop(self.conn);
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::RemoveFile(self.path.display().to_string(), e)),
        }
    }
}

fn build_where_clause(filter: &QueryFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        clauses.push(format!("status = ?{}", values.len() + 1));
        let s = match status {
            AuditStatus::Success => "success",
            AuditStatus::Failure => "failure",
        };
        values.push(Box::new(s.to_string()));
    }
    if let Some(tool_name) = &filter.tool_name {
        clauses.push(format!("tool_name = ?{}", values.len() + 1));
        values.push(Box::new(tool_name.clone()));
    }
    if let Some(mcp_method) = &filter.mcp_method {
        clauses.push(format!("mcp_method = ?{}", values.len() + 1));
        values.push(Box::new(mcp_method.clone()));
    }
    if let Some(term) = &filter.search_term {
        let pattern = format!("%{term}%");
        let start = values.len() + 1;
        clauses.push(format!(
            "(id LIKE ?{start} OR request_preview LIKE ?{p1} OR response_preview LIKE ?{p2} OR error_details LIKE ?{p3})",
            p1 = start + 1,
            p2 = start + 2,
            p3 = start + 3,
        ));
        for _ in 0..4 {
            values.push(Box::new(pattern.clone()));
        }
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", clauses.join(" AND ")), values)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    let status_text: String = row.get(5)?;
    let status = if status_text == "failure" {
        AuditStatus::Failure
    } else {
        AuditStatus::Success
    };
    let duration_ms: Option<i64> = row.get(4)?;
    let request_preview: String = row.get(8)?;
    let response_preview: Option<String> = row.get(9)?;
    let error_details: Option<String> = row.get(10)?;

    Ok(AuditRecord {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        mcp_method: row.get(2)?,
        tool_name: row.get(3)?,
        duration_ms: duration_ms.map(|d| u64::try_from(d).unwrap_or(0)),
        status,
        proxy_version: row.get(6)?,
        target_server_alias: row.get(7)?,
        request_preview: parse_json_column(&request_preview),
        response_preview: response_preview.as_deref().map(parse_json_column),
        error_details: error_details.as_deref().map(parse_json_column),
    })
}

fn parse_json_column(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or(Value::Null)
}

fn serialize_defensive(value: &Value, field: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::warn!(field, error = %e, "failed to serialize audit field; storing null");
        "null".to_string()
    })
}

fn apply_pragmas(conn: &Connection) -> Result<(), StoreError> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(5_000))?;
    Ok(())
}

fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let current: Option<i64> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .optional()?;
    match current {
        None => {
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", params![SCHEMA_VERSION])?;
        }
        Some(v) if v == SCHEMA_VERSION => {}
        Some(v) if v < SCHEMA_VERSION => {
            // No migrations are defined between schema v1 and SCHEMA_VERSION yet.
            conn.execute("UPDATE schema_version SET version = ?1", params![SCHEMA_VERSION])?;
        }
        Some(v) => {
            return Err(StoreError::VersionMismatch {
                found: v,
                expected: SCHEMA_VERSION,
            })
        }
    }

    conn.execute(
        "CREATE TABLE IF NOT EXISTS logs (
            id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            mcp_method TEXT,
            tool_name TEXT,
            duration_ms INTEGER,
            status TEXT NOT NULL,
            proxy_version TEXT,
            target_server_alias TEXT,
            request_preview TEXT NOT NULL,
            response_preview TEXT,
            error_details TEXT
        )",
        [],
    )?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_logs_timestamp ON logs (timestamp DESC)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_logs_status ON logs (status)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_logs_tool_name ON logs (tool_name)", [])?;
    conn.execute("CREATE INDEX IF NOT EXISTS idx_logs_mcp_method ON logs (mcp_method)", [])?;
    Ok(())
}

#[cfg(unix)]
fn create_dir_all_0755(path: &Path) -> std::io::Result<()> {
    use std::fs::DirBuilder;
    use std::os::unix::fs::DirBuilderExt;
    DirBuilder::new().recursive(true).mode(0o755).create(path)
}

#[cfg(not(unix))]
fn create_dir_all_0755(path: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_store() -> (tempfile::TempDir, LogStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("logs.db");
        let store = LogStore::open(&path).expect("open store");
        (dir, store)
    }

    #[test]
    fn open_creates_parent_dir_and_schema() {
        let (_dir, _store) = temp_store();
    }

    #[test]
    fn insert_and_query_round_trip() {
        let (_dir, store) = temp_store();
        let mut ok = AuditRecord::success(Some("tool/call".into()), Some("echo".into()), 12, json!({"x": 1}), json!({"ok": true}));
        ok.ensure_defaults("0.1.0");
        let mut fail = AuditRecord::failure(Some("x".into()), None, 3, json!(null), json!({"code": -1}));
        fail.ensure_defaults("0.1.0");
        store.insert_batch(&[ok.clone(), fail.clone()]).expect("insert");

        let all = store.query(&QueryFilter::default()).expect("query");
        assert_eq!(all.total_count, 2);
        assert_eq!(all.logs.len(), 2);

        let success_only = store
            .query(&QueryFilter {
                status: Some(AuditStatus::Success),
                ..Default::default()
            })
            .expect("query");
        assert_eq!(success_only.total_count, 1);
        assert_eq!(success_only.logs[0].tool_name.as_deref(), Some("echo"));
    }

    #[test]
    fn query_total_count_matches_unfiltered_count() {
        let (_dir, store) = temp_store();
        for i in 0..5 {
            let mut r = AuditRecord::success(None, None, i, json!(null), json!(null));
            r.ensure_defaults("0.1.0");
            store.insert_batch(&[r]).expect("insert");
        }
        let result = store.query(&QueryFilter::default()).expect("query");
        assert_eq!(result.total_count, 5);
    }

    #[test]
    fn get_by_id_returns_none_for_missing() {
        let (_dir, store) = temp_store();
        assert!(store.get_by_id("nope").expect("lookup").is_none());
    }

    #[test]
    fn search_term_matches_request_preview() {
        let (_dir, store) = temp_store();
        let mut r = AuditRecord::success(None, None, 0, json!({"needle": "findme"}), json!(null));
        r.ensure_defaults("0.1.0");
        store.insert_batch(&[r]).expect("insert");
        let result = store
            .query(&QueryFilter {
                search_term: Some("findme".to_string()),
                ..Default::default()
            })
            .expect("query");
        assert_eq!(result.total_count, 1);
    }

    #[test]
    fn clear_removes_file_and_is_idempotent_on_missing() {
        let (dir, store) = temp_store();
        let path = dir.path().join("nested").join("logs.db");
        store.clear().expect("clear");
        assert!(!path.exists());
        // Clearing again via a fresh handle on a missing file must succeed.
        let store2 = LogStore::open(&path).expect("reopen");
        store2.clear().expect("clear missing is success");
    }
}
