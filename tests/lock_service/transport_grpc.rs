//! gRPC transport integration tests.
//!
//! Starts a tonic gRPC server and exercises it with the generated client.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use lockstore::service::grpc::{
    GrpcLock, LockRequest, LockServiceClient, RefreshRequest, ReleaseRequest, TryLockRequest,
};
use lockstore::LockService;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;
use tonic::Code;

use crate::support;

/// Bind to port 0, spawn the gRPC server, and return a connected client.
async fn start_server(service: Arc<LockService>) -> LockServiceClient<Channel> {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let grpc_svc = lockstore::service::grpc_server(service);
    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .add_service(grpc_svc)
            .serve_with_incoming(TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    let endpoint = format!("http://{addr}");
    LockServiceClient::connect(endpoint).await.unwrap()
}

fn wire(id: &str, owner: &str, ttl: Duration) -> GrpcLock {
    GrpcLock::new(id, owner, SystemTime::now() + ttl)
}

fn try_req(lock: GrpcLock) -> TryLockRequest {
    TryLockRequest { lock: Some(lock) }
}

fn lock_req(lock: GrpcLock, timeout: Duration) -> LockRequest {
    LockRequest {
        lock: Some(lock),
        timeout: Some(timeout.try_into().unwrap()),
    }
}

#[tokio::test]
async fn lifecycle_status_codes() {
    for (name, service) in support::services() {
        let mut client = start_server(service).await;
        let held = wire("1234", "1234", Duration::from_secs(30));

        client.try_lock(try_req(held.clone())).await.unwrap();

        let busy = client.try_lock(try_req(held.clone())).await.unwrap_err();
        assert_eq!(busy.code(), Code::FailedPrecondition, "{name}");

        let mut intruder = held.clone();
        intruder.owner = "12345".into();
        let denied = client
            .release(ReleaseRequest { lock: Some(intruder) })
            .await
            .unwrap_err();
        assert_eq!(denied.code(), Code::PermissionDenied, "{name}");

        let mut earlier = held.clone();
        earlier.expires = Some((SystemTime::now() + Duration::from_secs(5)).into());
        let invalid = client
            .refresh(RefreshRequest { lock: Some(earlier) })
            .await
            .unwrap_err();
        assert_eq!(invalid.code(), Code::InvalidArgument, "{name}");

        let missing = client
            .refresh(RefreshRequest {
                lock: Some(wire("123456", "1234", Duration::from_secs(30))),
            })
            .await
            .unwrap_err();
        assert_eq!(missing.code(), Code::NotFound, "{name}");

        client
            .release(ReleaseRequest { lock: Some(held) })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn lock_waits_for_expiry() {
    for (name, service) in support::services() {
        let mut client = start_server(service).await;

        client
            .try_lock(try_req(wire("job", "a", Duration::from_millis(150))))
            .await
            .unwrap();

        let short = client
            .lock(lock_req(wire("job", "b", Duration::from_secs(30)), Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert_eq!(short.code(), Code::FailedPrecondition, "{name}");

        client
            .lock(lock_req(wire("job", "b", Duration::from_secs(30)), Duration::from_secs(3)))
            .await
            .unwrap_or_else(|e| panic!("{name}: {e}"));
    }
}

#[tokio::test]
async fn lock_without_timeout_tries_once() {
    let mut client = start_server(support::cas_service()).await;
    client
        .try_lock(try_req(wire("job", "a", Duration::from_secs(30))))
        .await
        .unwrap();

    let status = client
        .lock(LockRequest {
            lock: Some(wire("job", "b", Duration::from_secs(30))),
            timeout: None,
        })
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::FailedPrecondition);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let mut client = start_server(support::transactional_service()).await;

    let status = client.try_lock(TryLockRequest { lock: None }).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let no_expiry = GrpcLock {
        id: "job".into(),
        owner: "a".into(),
        expires: None,
    };
    let status = client.try_lock(try_req(no_expiry.clone())).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    // Release only needs the id and owner.
    client
        .release(ReleaseRequest { lock: Some(no_expiry) })
        .await
        .unwrap();
}
