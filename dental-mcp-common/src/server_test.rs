//! Unit tests for server builder utilities.

use super::server::{McpServerBuilder, ServerError, shutdown_channel};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::routing::get;
use rmcp::ServerHandler;
use tower::ServiceExt;

#[derive(Clone)]
struct NoopServer;

impl ServerHandler for NoopServer {}

#[test]
fn test_server_error_bind_failed_display() {
    let err = ServerError::BindFailed {
        addr: "0.0.0.0:8080".parse().unwrap(),
        message: "Address already in use".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("0.0.0.0:8080"), "Should contain bind address");
    assert!(
        msg.contains("Address already in use"),
        "Should contain error message"
    );
}

#[test]
fn test_server_error_transport_display() {
    let err = ServerError::Transport("Connection reset".to_string());
    assert!(err.to_string().contains("Connection reset"));
}

#[test]
fn test_server_error_io_conversion() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: ServerError = io_err.into();
    assert!(matches!(err, ServerError::Io(_)));
}

#[tokio::test]
async fn test_shutdown_channel_async() {
    let (tx, rx) = shutdown_channel();

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let _ = tx.send(());
    });

    let result = rx.await;
    assert!(result.is_ok(), "Should receive shutdown signal");
}

#[tokio::test]
async fn test_extra_routes_are_served() {
    let builder = McpServerBuilder::new(NoopServer)
        .with_routes(axum::Router::new().route("/health", get(|| async { "ok" })));

    let response = builder
        .router()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let builder = McpServerBuilder::new(NoopServer)
        .with_routes(axum::Router::new().route("/health", get(|| async { "ok" })));

    let response = builder
        .router()
        .oneshot(
            Request::get("/health")
                .header("origin", "https://voice-agent.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}

#[tokio::test]
async fn test_graceful_shutdown_over_http() {
    let (tx, rx) = shutdown_channel();
    let server = McpServerBuilder::new(NoopServer)
        .with_transport(crate::transport::Transport::http(0))
        .with_shutdown(rx)
        .run();

    let trigger = async move {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let _ = tx.send(());
    };

    let (result, ()) = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        async { tokio::join!(server, trigger) },
    )
    .await
    .expect("server should stop after shutdown signal");
    assert!(result.is_ok());
}
