//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::{Ipv4Addr, SocketAddr, TcpListener as StdTcpListener};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use svckit::observability::{build_logger, LogBuffer, LogConfig, LogFormat, LogLevel, Logger};
use tokio::net::TcpStream;

pub const ALIVE: &str = "I'm doing science and I'm still alive.";

/// Debug-level JSON logger writing into a buffer the test can inspect.
pub fn json_logger() -> (Logger, LogBuffer) {
    let buf = LogBuffer::new();
    let config = LogConfig {
        level: LogLevel::Debug,
        format: LogFormat::Json,
    };
    let logger = build_logger(&config, buf.clone()).unwrap();
    (logger, buf)
}

/// A port that was free a moment ago.
pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).unwrap();
    listener.local_addr().unwrap().port()
}

/// Trivial handler answering 200 with a JSON status.
pub fn ok_router() -> Router {
    Router::new().route(
        "/",
        get(|| async { (StatusCode::OK, Json(json!({ "status": ALIVE }))) }),
    )
}

/// Wait until something accepts TCP connections on `port`.
pub async fn wait_until_listening(port: u16) {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "nothing listening on port {port}"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

pub fn client() -> reqwest::Client {
    svckit::http::client_builder().no_proxy().build().unwrap()
}

pub fn url(port: u16, path: &str) -> String {
    format!("http://127.0.0.1:{port}{path}")
}

/// Index of the first log line with `message`, panicking if absent.
pub fn position(messages: &[String], message: &str) -> usize {
    messages
        .iter()
        .position(|m| m == message)
        .unwrap_or_else(|| panic!("missing log message {message:?} in {messages:?}"))
}
