//! gRPC transport: maps the four lock RPCs onto a [`LockService`].
//!
//! Requires the `grpc` feature. Uses tonic for the server and prost for
//! message serialization (standard protobuf wire format, no `.proto` file).
//!
//! ## RPCs (`lock.LockService`)
//!
//! - `TryLock(TryLockRequest) -> TryLockResponse`
//! - `Lock(LockRequest) -> LockResponse`: blocks up to `timeout`
//! - `Refresh(RefreshRequest) -> RefreshResponse`
//! - `Release(ReleaseRequest) -> ReleaseResponse`
//!
//! Responses are empty; failures are carried in the `Status` code.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lockstore::{service, LockService};
//!
//! let service = Arc::new(LockService::from_config(&config)?);
//!
//! // Get the server to compose with other tonic routes
//! let grpc_svc = service::grpc_server(service.clone());
//!
//! // Or serve directly
//! service::serve_grpc(service, "[::1]:9876".parse()?).await?;
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tonic::{Code, Request, Response, Status};

use super::lock_service::{CancelOnDrop, LockService};
use crate::lock::{CancelToken, Lock, LockError};

// ---------------------------------------------------------------------------
// Message types (standard protobuf wire format)
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, prost::Message)]
pub struct GrpcLock {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub owner: String,
    #[prost(message, optional, tag = "3")]
    pub expires: Option<prost_types::Timestamp>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TryLockRequest {
    #[prost(message, optional, tag = "1")]
    pub lock: Option<GrpcLock>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TryLockResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LockRequest {
    #[prost(message, optional, tag = "1")]
    pub lock: Option<GrpcLock>,
    /// How long to wait for the lock; absent means a single attempt.
    #[prost(message, optional, tag = "2")]
    pub timeout: Option<prost_types::Duration>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LockResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RefreshRequest {
    #[prost(message, optional, tag = "1")]
    pub lock: Option<GrpcLock>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RefreshResponse {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReleaseRequest {
    #[prost(message, optional, tag = "1")]
    pub lock: Option<GrpcLock>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ReleaseResponse {}

impl GrpcLock {
    pub fn new(id: impl Into<String>, owner: impl Into<String>, expires: SystemTime) -> Self {
        GrpcLock {
            id: id.into(),
            owner: owner.into(),
            expires: Some(expires.into()),
        }
    }
}

impl From<&Lock> for GrpcLock {
    fn from(lock: &Lock) -> Self {
        GrpcLock::new(lock.id.clone(), lock.owner.clone(), lock.expires_at)
    }
}

// ---------------------------------------------------------------------------
// Generated service trait + server/client
// ---------------------------------------------------------------------------

include!(concat!(env!("OUT_DIR"), "/lock.LockService.rs"));

pub use lock_service_client::LockServiceClient;
pub use lock_service_server::{LockService as LockRpc, LockServiceServer};

// ---------------------------------------------------------------------------
// Request decoding and error mapping
// ---------------------------------------------------------------------------

/// Decode the wire lock. `release` does not need an expiry; the others do.
fn decode_lock(lock: Option<GrpcLock>, needs_expiry: bool) -> Result<Lock, LockError> {
    let lock = lock.ok_or_else(|| LockError::InvalidRequest("missing lock".into()))?;
    if lock.id.is_empty() {
        return Err(LockError::InvalidRequest("missing lock id".into()));
    }

    let expires_at = match lock.expires {
        Some(ts) => SystemTime::try_from(ts)
            .map_err(|e| LockError::InvalidRequest(format!("invalid expires: {e}")))?,
        None if needs_expiry => {
            return Err(LockError::InvalidRequest("missing lock expires".into()))
        }
        None => UNIX_EPOCH,
    };

    Ok(Lock {
        id: lock.id,
        owner: lock.owner,
        expires_at,
    })
}

fn decode_timeout(timeout: Option<prost_types::Duration>) -> Result<Duration, LockError> {
    match timeout {
        None => Ok(Duration::ZERO),
        Some(d) => Duration::try_from(d)
            .map_err(|e| LockError::InvalidRequest(format!("invalid timeout: {e}"))),
    }
}

/// The gRPC status code each lock error is reported with.
pub fn status_code(err: &LockError) -> Code {
    match err {
        LockError::Busy => Code::FailedPrecondition,
        LockError::InvalidOwner => Code::PermissionDenied,
        LockError::InvalidRefresh | LockError::InvalidRequest(_) => Code::InvalidArgument,
        LockError::NotFound => Code::NotFound,
        LockError::Cancelled => Code::Cancelled,
        LockError::Store(e) if e.is_transient() => Code::Unavailable,
        LockError::Store(_) => Code::Internal,
    }
}

impl From<LockError> for Status {
    fn from(err: LockError) -> Self {
        Status::new(status_code(&err), err.to_string())
    }
}

/// Run a store call on the blocking pool; the lock protocol is synchronous.
async fn run_blocking<F>(f: F) -> Result<(), Status>
where
    F: FnOnce() -> Result<(), LockError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Status::internal(format!("lock worker failed: {e}")))?
        .map_err(Status::from)
}

// ---------------------------------------------------------------------------
// Handler implementation
// ---------------------------------------------------------------------------

/// gRPC handler that wraps a `LockService` and implements the generated
/// `LockService` RPC trait.
pub struct GrpcHandler {
    service: Arc<LockService>,
}

impl GrpcHandler {
    pub fn new(service: Arc<LockService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl LockRpc for GrpcHandler {
    async fn try_lock(
        &self,
        request: Request<TryLockRequest>,
    ) -> Result<Response<TryLockResponse>, Status> {
        let lock = decode_lock(request.into_inner().lock, true)?;
        let service = self.service.clone();
        run_blocking(move || service.try_lock(&lock)).await?;
        Ok(Response::new(TryLockResponse {}))
    }

    async fn lock(&self, request: Request<LockRequest>) -> Result<Response<LockResponse>, Status> {
        let req = request.into_inner();
        let lock = decode_lock(req.lock, true)?;
        let timeout = decode_timeout(req.timeout)?;

        // Dropped with this future if the client goes away mid-wait.
        let guard = CancelOnDrop(CancelToken::new());
        let token = guard.0.clone();
        let service = self.service.clone();
        run_blocking(move || service.lock(&lock, timeout, Some(&token))).await?;
        drop(guard);

        Ok(Response::new(LockResponse {}))
    }

    async fn refresh(
        &self,
        request: Request<RefreshRequest>,
    ) -> Result<Response<RefreshResponse>, Status> {
        let lock = decode_lock(request.into_inner().lock, true)?;
        let service = self.service.clone();
        run_blocking(move || service.refresh(&lock)).await?;
        Ok(Response::new(RefreshResponse {}))
    }

    async fn release(
        &self,
        request: Request<ReleaseRequest>,
    ) -> Result<Response<ReleaseResponse>, Status> {
        let lock = decode_lock(request.into_inner().lock, false)?;
        let service = self.service.clone();
        run_blocking(move || service.release(&lock)).await?;
        Ok(Response::new(ReleaseResponse {}))
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

/// Create a `LockServiceServer` from a shared `LockService`.
pub fn grpc_server(service: Arc<LockService>) -> LockServiceServer<GrpcHandler> {
    LockServiceServer::new(GrpcHandler::new(service))
}

/// Bind and serve the gRPC transport at `addr`.
pub async fn serve_grpc(
    service: Arc<LockService>,
    addr: SocketAddr,
) -> Result<(), tonic::transport::Error> {
    tonic::transport::Server::builder()
        .add_service(grpc_server(service))
        .serve(addr)
        .await
}

/// Like [`serve_grpc`], stopping gracefully when `signal` resolves.
pub async fn serve_grpc_with_shutdown<S>(
    service: Arc<LockService>,
    addr: SocketAddr,
    signal: S,
) -> Result<(), tonic::transport::Error>
where
    S: Future<Output = ()>,
{
    tonic::transport::Server::builder()
        .add_service(grpc_server(service))
        .serve_with_shutdown(addr, signal)
        .await
}
