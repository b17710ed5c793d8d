//! Service façade and its transports.
//!
//! [`LockService`] is transport-agnostic; the gRPC (`grpc` feature) and
//! HTTP (`http` feature) modules only decode requests, run the call on the
//! blocking pool and encode the outcome.

mod lock_service;

pub use lock_service::LockService;

// gRPC transport (requires "grpc" feature)
#[cfg(feature = "grpc")]
pub mod grpc;
#[cfg(feature = "grpc")]
pub use grpc::{grpc_server, serve_grpc, serve_grpc_with_shutdown};

// HTTP transport (requires "http" feature)
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::{router, serve};
