//! HTTP transport: maps JSON requests onto a [`LockService`].
//!
//! Requires the `http` feature. Uses axum for routing.
//!
//! ## Routes
//!
//! - `POST /locks/try`: non-blocking acquire.
//! - `POST /locks/lock`: blocking acquire, waits up to `timeout_ms`.
//! - `POST /locks/refresh`: extend a held lease.
//! - `POST /locks/release`: release a held lease.
//! - `GET /health`: `{ "ok": true }`.
//!
//! Bodies are `{ "id", "owner", "expires_at_ms", "timeout_ms" }`, with
//! `expires_at_ms` in milliseconds since the Unix epoch. Success is
//! `200 { "ok": true }`; failures use [`LockError::status_code`] and
//! `{ "error": "..." }`.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::lock_service::{CancelOnDrop, LockService};
use crate::lock::{from_unix_millis, CancelToken, Lock, LockError};

/// JSON request body shared by all lock routes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LockBody {
    pub id: String,
    pub owner: String,
    #[serde(default)]
    pub expires_at_ms: Option<u64>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl LockBody {
    fn into_lock(self, needs_expiry: bool) -> Result<Lock, LockError> {
        if self.id.is_empty() {
            return Err(LockError::InvalidRequest("missing lock id".into()));
        }
        let expires_at = match self.expires_at_ms {
            Some(ms) => from_unix_millis(ms),
            None if needs_expiry => {
                return Err(LockError::InvalidRequest("missing expires_at_ms".into()))
            }
            None => from_unix_millis(0),
        };
        Ok(Lock::new(self.id, self.owner, expires_at))
    }
}

/// Build an axum `Router` serving the lock routes for `service`.
pub fn router(service: Arc<LockService>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/locks/try", post(try_lock_handler))
        .route("/locks/lock", post(lock_handler))
        .route("/locks/refresh", post(refresh_handler))
        .route("/locks/release", post(release_handler))
        .with_state(service)
}

/// Serve the service over HTTP at the given address (e.g. `"0.0.0.0:8080"`).
pub async fn serve(service: Arc<LockService>, addr: &str) -> Result<(), std::io::Error> {
    let app = router(service);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn try_lock_handler(
    State(service): State<Arc<LockService>>,
    Json(body): Json<LockBody>,
) -> Response {
    match body.into_lock(true) {
        Ok(lock) => run(move || service.try_lock(&lock)).await,
        Err(e) => respond(Err(e)),
    }
}

async fn lock_handler(
    State(service): State<Arc<LockService>>,
    Json(body): Json<LockBody>,
) -> Response {
    let timeout = Duration::from_millis(body.timeout_ms.unwrap_or(0));
    let lock = match body.into_lock(true) {
        Ok(lock) => lock,
        Err(e) => return respond(Err(e)),
    };

    // Dropped with this future if the client disconnects mid-wait.
    let guard = CancelOnDrop(CancelToken::new());
    let token = guard.0.clone();
    let response = run(move || service.lock(&lock, timeout, Some(&token))).await;
    drop(guard);
    response
}

async fn refresh_handler(
    State(service): State<Arc<LockService>>,
    Json(body): Json<LockBody>,
) -> Response {
    match body.into_lock(true) {
        Ok(lock) => run(move || service.refresh(&lock)).await,
        Err(e) => respond(Err(e)),
    }
}

async fn release_handler(
    State(service): State<Arc<LockService>>,
    Json(body): Json<LockBody>,
) -> Response {
    match body.into_lock(false) {
        Ok(lock) => run(move || service.release(&lock)).await,
        Err(e) => respond(Err(e)),
    }
}

/// Run a store call on the blocking pool; the lock protocol is synchronous.
async fn run<F>(f: F) -> Response
where
    F: FnOnce() -> Result<(), LockError> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => respond(result),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("lock worker failed: {e}") })),
        )
            .into_response(),
    }
}

fn respond(result: Result<(), LockError>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))).into_response(),
        Err(e) => {
            let status =
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}
