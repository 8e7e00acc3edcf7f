//! Command-line client for a running service.
//!
//! # Responsibilities
//! - Parse root flags (shared by every subcommand) from args and environment
//! - `get`: fetch a resource, optionally polling until interrupted
//! - `put`: send a body read from the input stream
//! - `version`: log the client's build information
//!
//! Response bodies go to the output stream; log events go to the logger's
//! writer, so the two can be separated by the caller.

use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::{StatusCode, Url};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

use crate::buildinfo::BuildInfo;
use crate::config::{envflag, ConfigError};
use crate::http::{client_builder, new_client};
use crate::observability::{build_logger, LogConfig, LogFormat, LogLevel, LoggingError};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("parsing cli: {0}")]
    Config(#[from] ConfigError),

    #[error("couldn't set up logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid resource path {path:?}: {reason}")]
    Path { path: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned {status}")]
    Status { url: Url, status: StatusCode },

    #[error("i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Root flags and the chosen subcommand.
#[derive(Debug, Clone, Parser)]
#[command(about = "Talk to a running svckit service")]
pub struct CliArgs {
    /// Base URL of the service.
    #[arg(long, global = true, default_value = "http://localhost:8000/", value_parser = Url::parse)]
    pub url: Url,

    /// Logging level.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log line encoding.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Connect directly, ignoring `HTTP_PROXY` and friends.
    #[arg(long, global = true)]
    pub direct: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Retrieve items from the service
    Get {
        /// Resource path, relative to the base URL.
        stream: String,

        /// How many existing items to retrieve (0 leaves it to the server).
        #[arg(long, default_value_t = 0)]
        count: u32,

        /// Do not exit; poll for new items until interrupted.
        #[arg(long)]
        tail: bool,

        /// Delay between polls when tailing.
        #[arg(long, default_value = "1s", value_parser = parse_interval)]
        interval: Duration,
    },
    /// Send the input stream to the service
    Put {
        /// Resource path, relative to the base URL.
        destination: String,
    },
    /// Show version information
    Version,
}

/// Durations written as `<n>ms` or `<n>s`.
fn parse_interval(raw: &str) -> Result<Duration, String> {
    let parsed = if let Some(ms) = raw.strip_suffix("ms") {
        ms.parse().map(Duration::from_millis)
    } else if let Some(s) = raw.strip_suffix('s') {
        s.parse().map(Duration::from_secs)
    } else {
        return Err(format!("{raw:?} needs a unit, ms or s"));
    };
    parsed.map_err(|e| format!("{raw:?}: {e}"))
}

/// Parse `args`/`env`, then execute the subcommand until it finishes or
/// `token` is canceled.
pub async fn run<W, R, O>(
    token: CancellationToken,
    log_output: W,
    input: R,
    output: O,
    args: &[String],
    env: &[String],
) -> Result<(), CliError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    if args.is_empty() {
        return Err(ConfigError::NoArgs.into());
    }
    let cli: CliArgs = envflag::parse(args, env)?;
    let logger = build_logger(
        &LogConfig {
            level: cli.log_level,
            format: cli.log_format,
        },
        log_output,
    )?;

    let client = if cli.direct {
        client_builder().no_proxy().build()
    } else {
        new_client()
    }
    .map_err(CliError::Client)?;
    let cmd = Client {
        http: client,
        base: cli.url,
    };

    logger.scope(execute(cli.command, cmd, token, input, output)).await
}

async fn execute<R, O>(
    command: Command,
    cmd: Client,
    token: CancellationToken,
    mut input: R,
    mut output: O,
) -> Result<(), CliError>
where
    R: AsyncRead + Unpin,
    O: AsyncWrite + Unpin,
{
    tracing::debug!(base = %cmd.base, "client ready");
    match command {
        Command::Get {
            stream,
            count,
            tail,
            interval,
        } => {
            let url = cmd.resource(&stream, count)?;
            cmd.get(&token, &url, tail, interval, &mut output).await
        }
        Command::Put { destination } => {
            let url = cmd.resource(&destination, 0)?;
            let mut body = Vec::new();
            input.read_to_end(&mut body).await?;
            cmd.put(&url, body, &mut output).await
        }
        Command::Version => {
            let build = BuildInfo::current();
            tracing::info!(
                version = %build.version,
                commit = %build.commit,
                date = %build.date,
                rustc = %build.rustc,
                "svckit version information"
            );
            Ok(())
        }
    }
}

struct Client {
    http: reqwest::Client,
    base: Url,
}

impl Client {
    fn resource(&self, path: &str, count: u32) -> Result<Url, CliError> {
        let mut url = self
            .base
            .join(path.trim_start_matches('/'))
            .map_err(|e| CliError::Path {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        if count > 0 {
            url.query_pairs_mut().append_pair("count", &count.to_string());
        }
        Ok(url)
    }

    async fn get<O>(
        &self,
        token: &CancellationToken,
        url: &Url,
        tail: bool,
        interval: Duration,
        output: &mut O,
    ) -> Result<(), CliError>
    where
        O: AsyncWrite + Unpin,
    {
        loop {
            let body = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                body = self.fetch(self.http.get(url.clone()), url) => body?,
            };
            output.write_all(&body).await?;
            output.flush().await?;

            if !tail {
                return Ok(());
            }
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("tail interrupted");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    async fn put<O>(&self, url: &Url, body: Vec<u8>, output: &mut O) -> Result<(), CliError>
    where
        O: AsyncWrite + Unpin,
    {
        tracing::debug!(url = %url, bytes = body.len(), "sending");
        let reply = self.fetch(self.http.put(url.clone()).body(body), url).await?;
        output.write_all(&reply).await?;
        output.flush().await?;
        Ok(())
    }

    async fn fetch(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<Vec<u8>, CliError> {
        let request_error = |source| CliError::Request {
            url: url.clone(),
            source,
        };
        let res = request.send().await.map_err(request_error)?;
        let status = res.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "request rejected");
            return Err(CliError::Status {
                url: url.clone(),
                status,
            });
        }
        let body = res.bytes().await.map_err(request_error)?;
        Ok(body.to_vec())
    }
}
