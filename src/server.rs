//! HTTP trigger for the sync job.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST`/`GET` | `/sync` | Run one sync of the configured repository |
//! | `GET`  | `/sync/{job_id}` | Status of a sync job |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `/sync` is accepted from a scheduler presenting
//! `Authorization: Bearer <cron secret>` or from an administrator named by
//! the `X-User-Id` header. Each caller, keyed by the first
//! `X-Forwarded-For` address, may trigger at most `trigger.max_per_hour`
//! runs per hour.
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "forbidden", "message": "admin or cron secret required" } }
//! ```
//!
//! Error codes: `forbidden` (403), `not_found` (404), `rate_limited` (429),
//! `internal` (500), `sync_failed` (502).

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use skill_catalog_core::models::SyncJob;
use skill_catalog_core::source::RemoteSource;
use skill_catalog_core::store::CatalogStore;
use skill_catalog_core::sync::{run_sync, SyncSettings, SyncSummary};

use crate::config::Config;
use crate::db;
use crate::github::GitHubSource;
use crate::sqlite_store::SqliteStore;

const USER_ID_HEADER: &str = "x-user-id";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// ============ Rate limiting ============

/// Per-key admission control for the trigger endpoint.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Record one attempt for `key`; `false` means the ceiling is reached.
    async fn allow(&self, key: &str) -> Result<bool>;
}

/// In-process fixed-window limiter.
pub struct FixedWindowLimiter {
    max: u32,
    window: Duration,
    windows: Mutex<HashMap<String, (Instant, u32)>>,
}

impl FixedWindowLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn per_hour(max: u32) -> Self {
        Self::new(max, Duration::from_secs(3600))
    }
}

#[async_trait]
impl RateLimiter for FixedWindowLimiter {
    async fn allow(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();
        windows.retain(|_, (start, _)| now.duration_since(*start) < self.window);
        let entry = windows.entry(key.to_string()).or_insert((now, 0));
        if entry.1 >= self.max {
            return Ok(false);
        }
        entry.1 += 1;
        Ok(true)
    }
}

/// Rate-limit key for a request: the first `X-Forwarded-For` entry.
pub fn caller_key(headers: &HeaderMap) -> String {
    let ip = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown");
    format!("sync:{}", ip)
}

// ============ State ============

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn CatalogStore>,
    source: Arc<dyn RemoteSource>,
    settings: Arc<SyncSettings>,
    cron_secret: Option<String>,
    limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        source: Arc<dyn RemoteSource>,
        settings: SyncSettings,
        cron_secret: Option<String>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            store,
            source,
            settings: Arc::new(settings),
            cron_secret,
            limiter,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sync", get(handle_sync).post(handle_sync))
        .route("/sync/{job_id}", get(handle_get_job))
        .route("/health", get(handle_health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` against the configured
/// database and GitHub repository. Runs until the process is terminated.
pub async fn run_server(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let store: Arc<dyn CatalogStore> = Arc::new(SqliteStore::new(pool));
    let source: Arc<dyn RemoteSource> = Arc::new(GitHubSource::new(&config.github)?);

    let cron_secret = config.trigger.cron_secret();
    if cron_secret.is_none() {
        tracing::warn!(
            env = %config.trigger.cron_secret_env,
            "no cron secret set; only administrators can trigger a sync"
        );
    }

    let state = AppState::new(
        store,
        source,
        config.sync_settings(None, None),
        cron_secret,
        Arc::new(FixedWindowLimiter::per_hour(config.trigger.max_per_hour)),
    );

    let bind_addr = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("Sync server listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn forbidden() -> AppError {
    AppError::new(
        StatusCode::FORBIDDEN,
        "forbidden",
        "admin or cron secret required",
    )
}

fn internal(err: anyhow::Error) -> AppError {
    tracing::error!(error = %format!("{:#}", err), "request failed");
    AppError::new(
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal",
        err.to_string(),
    )
}

// ============ POST /sync ============

async fn is_authorized(state: &AppState, headers: &HeaderMap) -> Result<bool> {
    if let Some(secret) = &state.cron_secret {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if presented == Some(secret.as_str()) {
            return Ok(true);
        }
    }

    let user_id = match headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() => id,
        _ => return Ok(false),
    };
    Ok(state
        .store
        .get_user(user_id)
        .await?
        .map(|u| u.is_admin())
        .unwrap_or(false))
}

/// Handler for `POST /sync` (also `GET`, for schedulers that only GET).
///
/// Runs the sync to completion and returns its counters. A run that fails
/// as a whole answers `502` after the job has been recorded as failed.
///
/// The run is spawned onto its own task, so a caller that disconnects does
/// not cancel it and the job still reaches a terminal state.
async fn handle_sync(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SyncSummary>, AppError> {
    if !is_authorized(&state, &headers).await.map_err(internal)? {
        return Err(forbidden());
    }

    let key = caller_key(&headers);
    if !state.limiter.allow(&key).await.map_err(internal)? {
        return Err(AppError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many sync requests, try again later",
        ));
    }

    let store = state.store.clone();
    let source = state.source.clone();
    let settings = state.settings.clone();
    let run = tokio::spawn(async move {
        run_sync(store.as_ref(), source.as_ref(), &settings).await
    });

    let summary = run
        .await
        .map_err(|e| internal(anyhow::anyhow!("sync task failed: {}", e)))?
        .map_err(|e| {
            AppError::new(StatusCode::BAD_GATEWAY, "sync_failed", format!("{:#}", e))
        })?;

    Ok(Json(summary))
}

// ============ GET /sync/{job_id} ============

async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<SyncJob>, AppError> {
    match state.store.get_job(&job_id).await.map_err(internal)? {
        Some(job) => Ok(Json(job)),
        None => Err(AppError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("sync job not found: {}", job_id),
        )),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_fixed_window_ceiling() {
        let limiter = FixedWindowLimiter::per_hour(2);
        assert!(limiter.allow("sync:1.2.3.4").await.unwrap());
        assert!(limiter.allow("sync:1.2.3.4").await.unwrap());
        assert!(!limiter.allow("sync:1.2.3.4").await.unwrap());
        // Other callers have their own window.
        assert!(limiter.allow("sync:5.6.7.8").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(20));
        assert!(limiter.allow("k").await.unwrap());
        assert!(!limiter.allow("k").await.unwrap());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.allow("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_windows_are_dropped() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_millis(20));
        for i in 0..10 {
            limiter.allow(&format!("sync:10.0.0.{}", i)).await.unwrap();
        }
        assert_eq!(limiter.windows.lock().unwrap().len(), 10);

        tokio::time::sleep(Duration::from_millis(30)).await;
        limiter.allow("sync:10.0.0.99").await.unwrap();
        assert_eq!(limiter.windows.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_caller_key_uses_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller_key(&headers), "sync:unknown");

        headers.insert(
            FORWARDED_FOR_HEADER,
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(caller_key(&headers), "sync:203.0.113.7");
    }
}
