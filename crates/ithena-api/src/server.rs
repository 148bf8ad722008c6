//! Axum HTTP server exposing the record store to a local viewer.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use ithena_core::{AuditRecord, AuditStatus};
use ithena_sink::TokenProvider;
use ithena_store_sqlite::{LogStore, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Default bind port for the query API.
pub const DEFAULT_PORT: u16 = 8675;
/// How long the server waits for in-flight requests to finish once a
/// shutdown signal arrives, before forcing the listener closed.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Runtime configuration for [`serve`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Port to bind on `localhost`.
    pub port: u16,
    /// URL surfaced on `GET /api/auth/status` as `platformURL`.
    pub platform_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            platform_url: "https://app.ithena.dev".to_string(),
        }
    }
}

#[derive(Clone)]
struct AppState {
    store: Arc<LogStore>,
    token_provider: Arc<dyn TokenProvider>,
    platform_url: Arc<str>,
}

#[derive(Debug, Deserialize)]
struct LogsQueryParams {
    page: Option<u32>,
    limit: Option<u32>,
    status: Option<String>,
    tool_name: Option<String>,
    mcp_method: Option<String>,
    search: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LogsResponse {
    logs: Vec<AuditRecord>,
    total_count: u64,
    page: u32,
    limit: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct AuthStatusResponse {
    authenticated: bool,
    #[serde(rename = "platformURL")]
    platform_url: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VersionResponse {
    version: &'static str,
}

fn parse_status(raw: &str) -> Option<AuditStatus> {
    match raw {
        "success" => Some(AuditStatus::Success),
        "failure" => Some(AuditStatus::Failure),
        _ => None,
    }
}

async fn list_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsQueryParams>,
) -> Result<Json<LogsResponse>, StatusCode> {
    let filter = QueryFilter {
        status: params.status.as_deref().and_then(parse_status),
        tool_name: params.tool_name,
        mcp_method: params.mcp_method,
        search_term: params.search,
        page: params.page.unwrap_or(1),
        limit: params.limit.unwrap_or(0),
    };
    let store = Arc::clone(&state.store);
    let result = tokio::task::spawn_blocking(move || store.query(&filter))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "query task panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            tracing::warn!(error = %e, "query failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(LogsResponse {
        logs: result.logs,
        total_count: result.total_count,
        page: result.page,
        limit: result.limit,
    }))
}

async fn get_log(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<AuditRecord>, StatusCode> {
    let store = Arc::clone(&state.store);
    let lookup_id = id.clone();
    let record = tokio::task::spawn_blocking(move || store.get_by_id(&lookup_id))
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "lookup task panicked");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(|e| {
            tracing::warn!(error = %e, "lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    record.map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn auth_status(State(state): State<AppState>) -> Json<AuthStatusResponse> {
    let authenticated = state.token_provider.current_token().is_some_and(|t| !t.is_empty());
    Json(AuthStatusResponse {
        authenticated,
        platform_url: state.platform_url.to_string(),
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: ithena_core::PROXY_VERSION,
    })
}

async fn frontend_entry() -> Html<&'static str> {
    Html(INDEX_HTML)
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/logs", get(list_logs))
        .route("/api/logs/{id}", get(get_log))
        .route("/api/auth/status", get(auth_status))
        .route("/api/version", get(version))
        .fallback(get(frontend_entry))
        .with_state(state)
}

/// Binds `localhost:<config.port>`, best-effort opens the system browser,
/// and serves until a termination signal arrives, then drains for up to
/// [`DRAIN_TIMEOUT`] before forcing the listener closed.
///
/// # Errors
/// Returns [`ApiError::Bind`] if the port cannot be bound.
pub async fn serve(
    config: ApiConfig,
    store: Arc<LogStore>,
    token_provider: Arc<dyn TokenProvider>,
) -> Result<(), ApiError> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::Bind(addr.to_string(), e))?;

    let state = AppState {
        store,
        token_provider,
        platform_url: Arc::from(config.platform_url.as_str()),
    };
    let app = router(state);

    tracing::info!(%addr, "query API listening");
    best_effort_open_browser(&format!("http://{addr}"));

    let mut serve_handle = tokio::spawn(async move { axum::serve(listener, app.into_make_service()).await });

    tokio::select! {
        result = &mut serve_handle => {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "query API server exited with an error"),
                Err(e) => tracing::warn!(error = %e, "query API server task panicked"),
            }
        }
        () = shutdown_signal() => {
            tracing::info!("shutdown signal received; draining for up to {DRAIN_TIMEOUT:?}");
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut serve_handle).await.is_err() {
                tracing::warn!("drain timed out; forcing query API shutdown");
                serve_handle.abort();
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        let Ok(mut sig) = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) else {
            std::future::pending::<()>().await;
            return;
        };
        sig.recv().await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

fn best_effort_open_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let command = ("open", Vec::<&str>::new());
    #[cfg(target_os = "windows")]
    let command = ("cmd", vec!["/C", "start"]);
    #[cfg(all(unix, not(target_os = "macos")))]
    let command = ("xdg-open", Vec::<&str>::new());

    let (program, mut args) = command;
    args.push(url);
    if let Err(e) = std::process::Command::new(program).args(&args).spawn() {
        tracing::debug!(error = %e, "could not launch system browser");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ithena_sink::token::testing::FakeTokenProvider;
    use ithena_store_sqlite::LogStore;
    use serde_json::json;

    async fn spawn_test_server() -> (String, Arc<LogStore>, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(LogStore::open(&dir.path().join("logs.db")).expect("open store"));
        let mut record = AuditRecord::success(Some("tool/call".into()), Some("echo".into()), 5, json!({}), json!({"ok": true}));
        record.ensure_defaults("0.1.0");
        store.insert_batch(&[record.clone()]).expect("seed");

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let state = AppState {
            store: Arc::clone(&store),
            token_provider: Arc::new(FakeTokenProvider::empty()),
            platform_url: Arc::from("https://app.ithena.dev"),
        };
        let app = router(state);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app.into_make_service()).await;
        });
        (format!("http://{addr}"), store, dir)
    }

    #[tokio::test]
    async fn version_endpoint_reports_crate_version() {
        let (base, _store, _dir) = spawn_test_server().await;
        let resp: VersionResponse = reqwest::get(format!("{base}/api/version"))
            .await
            .expect("request")
            .json()
            .await
            .expect("json");
        assert_eq!(resp.version, ithena_core::PROXY_VERSION);
    }

    #[tokio::test]
    async fn logs_endpoint_returns_seeded_record() {
        let (base, _store, _dir) = spawn_test_server().await;
        let resp: LogsResponse = reqwest::get(format!("{base}/api/logs"))
            .await
            .expect("request")
            .json()
            .await
            .expect("json");
        assert_eq!(resp.total_count, 1);
        assert_eq!(resp.logs[0].tool_name.as_deref(), Some("echo"));
    }

    #[tokio::test]
    async fn missing_log_id_returns_404() {
        let (base, _store, _dir) = spawn_test_server().await;
        let status = reqwest::get(format!("{base}/api/logs/does-not-exist"))
            .await
            .expect("request")
            .status();
        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn auth_status_reports_unauthenticated_without_token() {
        let (base, _store, _dir) = spawn_test_server().await;
        let resp: AuthStatusResponse = reqwest::get(format!("{base}/api/auth/status"))
            .await
            .expect("request")
            .json()
            .await
            .expect("json");
        assert!(!resp.authenticated);
    }
}
