fn main() {
    // Only run gRPC codegen when the "grpc" feature is enabled.
    // Cargo sets CARGO_FEATURE_GRPC when compiling with --features grpc.
    if std::env::var("CARGO_FEATURE_GRPC").is_ok() {
        let method = |name: &str, route: &str, input: &str, output: &str| {
            tonic_build::manual::Method::builder()
                .name(name)
                .route_name(route)
                .input_type(format!("crate::service::grpc::{input}"))
                .output_type(format!("crate::service::grpc::{output}"))
                .codec_path("tonic::codec::ProstCodec")
                .build()
        };

        let service = tonic_build::manual::Service::builder()
            .name("LockService")
            .package("lock")
            .method(method("try_lock", "TryLock", "TryLockRequest", "TryLockResponse"))
            .method(method("lock", "Lock", "LockRequest", "LockResponse"))
            .method(method("refresh", "Refresh", "RefreshRequest", "RefreshResponse"))
            .method(method("release", "Release", "ReleaseRequest", "ReleaseResponse"))
            .build();

        tonic_build::manual::Builder::new().compile(&[service]);
    }
}
