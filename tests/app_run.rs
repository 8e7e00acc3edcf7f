//! End-to-end runs of the service skeleton.

use std::time::Duration;

use svckit::app::{self, HEALTH_STATUS};
use svckit::golden;
use svckit::observability::LogBuffer;
use svckit::AppError;
use tokio_util::sync::CancellationToken;

mod common;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn runs_until_canceled_with_port_from_env() {
    let logs = LogBuffer::new();
    let port = common::free_port();
    let token = CancellationToken::new();

    let args = strings(&["svc", "--log-level=debug"]);
    let env = vec![format!("PORT={port}"), "LOG_FORMAT=json".to_string()];
    let handle = {
        let (token, logs) = (token.clone(), logs.clone());
        tokio::spawn(async move { app::run(token, logs, &args, &env).await })
    };
    common::wait_until_listening(port).await;

    let client = common::client();
    let health: serde_json::Value = client
        .get(common::url(port, "/healthz"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], HEALTH_STATUS);
    golden::assert_json("healthz body", "healthz.json", &health);

    let version = client.get(common::url(port, "/version")).send().await.unwrap();
    assert_eq!(version.status(), 200);

    token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("timed out waiting for app shutdown")
        .unwrap();
    assert!(result.is_ok(), "unexpected error: {result:?}");

    let messages = logs.messages();
    let setup = common::position(&messages, "app setup complete");
    let stopped = common::position(&messages, "HTTP service stopped");
    let exiting = common::position(&messages, "exiting");
    assert!(setup < stopped && stopped < exiting);
    assert!(messages.iter().any(|m| m == "creating HTTP router"));
}

#[tokio::test]
async fn port_conflict_surfaces_as_serve_error() {
    let blocker = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = blocker.local_addr().unwrap().port();

    let args = strings(&["svc", &format!("--port={port}")]);
    let result = app::run(CancellationToken::new(), LogBuffer::new(), &args, &[]).await;

    match result {
        Err(AppError::Serve(e)) => assert!(e.is_addr_in_use()),
        other => panic!("expected serve error, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_args_fail_before_serving() {
    let result = app::run(CancellationToken::new(), LogBuffer::new(), &[], &[]).await;
    assert!(matches!(result, Err(AppError::Config(_))));
}
