//! The client CLI against a live server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use svckit::cli::{self, CliError};
use svckit::observability::LogBuffer;
use svckit::{serve, ServeContext};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

mod common;

#[derive(Deserialize)]
struct ItemsQuery {
    count: Option<u32>,
}

fn items_router(hits: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route(
            "/items",
            get(move |Query(q): Query<ItemsQuery>| {
                let hits = hits.clone();
                async move {
                    let n = hits.fetch_add(1, Ordering::SeqCst) + 1;
                    format!("hit {n} count {}\n", q.count.unwrap_or(0))
                }
            })
            .put(|body: String| async move { format!("stored {body}") }),
        )
        .route("/broken", get(|| async { StatusCode::INTERNAL_SERVER_ERROR }))
}

struct Server {
    port: u16,
    token: CancellationToken,
    handle: JoinHandle<Result<(), svckit::ServeError>>,
    hits: Arc<AtomicUsize>,
}

impl Server {
    async fn start() -> Self {
        let (logger, _) = common::json_logger();
        let port = common::free_port();
        let token = CancellationToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let ctx = ServeContext::new(token.clone()).with_logger(logger);
        let router = items_router(hits.clone());
        let handle = tokio::spawn(async move { serve(&ctx, port, router).await });
        common::wait_until_listening(port).await;
        Self {
            port,
            token,
            handle,
            hits,
        }
    }

    fn args(&self, rest: &[&str]) -> Vec<String> {
        let mut args = vec![
            "svckit-cli".to_string(),
            format!("--url=http://127.0.0.1:{}/", self.port),
            "--direct".to_string(),
        ];
        args.extend(rest.iter().map(|s| s.to_string()));
        args
    }

    async fn stop(self) {
        self.token.cancel();
        let result = tokio::time::timeout(Duration::from_secs(1), self.handle)
            .await
            .expect("timed out waiting for server shutdown")
            .unwrap();
        assert!(result.is_ok());
    }
}

async fn run_cli(
    token: CancellationToken,
    args: &[String],
    env: &[String],
    input: &[u8],
) -> (Result<(), CliError>, Vec<u8>, LogBuffer) {
    let logs = LogBuffer::new();
    let mut output = Vec::new();
    let result = cli::run(token, logs.clone(), input, &mut output, args, env).await;
    (result, output, logs)
}

#[tokio::test]
async fn get_writes_the_body_to_output() {
    let server = Server::start().await;

    let (result, output, _) = run_cli(
        CancellationToken::new(),
        &server.args(&["get", "items", "--count", "2"]),
        &[],
        b"",
    )
    .await;
    result.unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "hit 1 count 2\n");

    server.stop().await;
}

#[tokio::test]
async fn base_url_can_come_from_env() {
    let server = Server::start().await;

    let args = vec!["svckit-cli".to_string(), "get".to_string(), "/items".to_string()];
    let env = vec![
        format!("URL=http://127.0.0.1:{}/", server.port),
        "DIRECT=true".to_string(),
    ];
    let (result, output, _) = run_cli(CancellationToken::new(), &args, &env, b"").await;
    result.unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "hit 1 count 0\n");

    server.stop().await;
}

#[tokio::test]
async fn put_sends_the_input_stream() {
    let server = Server::start().await;

    let (result, output, _) = run_cli(
        CancellationToken::new(),
        &server.args(&["put", "items"]),
        &[],
        b"three apples",
    )
    .await;
    result.unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "stored three apples");

    server.stop().await;
}

#[tokio::test]
async fn tail_polls_until_canceled() {
    let server = Server::start().await;
    let token = CancellationToken::new();

    let stopper = {
        let token = token.clone();
        let hits = server.hits.clone();
        tokio::spawn(async move {
            while hits.load(Ordering::SeqCst) < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            token.cancel();
        })
    };

    let args = server.args(&["get", "items", "--tail", "--interval", "10ms"]);
    let (result, output, _) = tokio::time::timeout(
        Duration::from_secs(2),
        run_cli(token, &args, &[], b""),
    )
    .await
    .expect("tail should stop on cancel");
    result.unwrap();
    stopper.await.unwrap();

    let text = String::from_utf8(output).unwrap();
    assert!(text.starts_with("hit 1 count 0\nhit 2 count 0\nhit 3 count 0\n"), "{text}");

    server.stop().await;
}

#[tokio::test]
async fn error_status_fails_the_command() {
    let server = Server::start().await;

    let (result, output, logs) = run_cli(
        CancellationToken::new(),
        &server.args(&["--log-format=json", "get", "broken"]),
        &[],
        b"",
    )
    .await;
    match result {
        Err(CliError::Status { status, .. }) => assert_eq!(status, 500),
        other => panic!("expected status error, got {other:?}"),
    }
    assert!(output.is_empty());
    assert!(logs.messages().iter().any(|m| m == "request rejected"));

    server.stop().await;
}

#[tokio::test]
async fn version_logs_build_information() {
    let (result, output, logs) = run_cli(
        CancellationToken::new(),
        &["svckit-cli", "--log-format=json", "version"].map(String::from),
        &[],
        b"",
    )
    .await;
    result.unwrap();
    assert!(output.is_empty());

    let line = logs
        .json_lines()
        .into_iter()
        .find(|l| l["message"] == "svckit version information")
        .expect("version event");
    assert_eq!(line["version"], svckit::buildinfo::BuildInfo::current().version);
}

#[tokio::test]
async fn missing_subcommand_is_a_config_error() {
    let (result, _, _) = run_cli(CancellationToken::new(), &["svckit-cli".to_string()], &[], b"").await;
    assert!(matches!(result, Err(CliError::Config(_))));
}
