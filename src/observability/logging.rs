//! Structured logging.
//!
//! # Responsibilities
//! - Build a logger (a non-global `tracing::Dispatch`) from config
//! - Carry that logger explicitly to the code that emits events
//! - Offer a one-shot process-wide fallback for callers without one
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, text format for development
//! - Timestamps are RFC 3339 UTC truncated to milliseconds
//! - No global subscriber is installed; events go through whichever logger
//!   the caller scoped the work with

use std::fmt;
use std::future::Future;
use std::sync::OnceLock;

use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument::{WithDispatch, WithSubscriber};
use tracing::Dispatch;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer};

static PROCESS_DEFAULT: OnceLock<Logger> = OnceLock::new();

/// Error type for logger construction.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("process default logger already installed")]
    DefaultAlreadySet,
}

/// Minimum level of events that are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output encoding of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

/// Logging configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

/// Formats event timestamps as `2006-01-02T15:04:05.000Z`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339Millis;

impl FormatTime for Rfc3339Millis {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ"))
    }
}

/// Logger capability handed to the code that emits events.
///
/// Cloning is cheap; all clones write to the same sink.
#[derive(Debug, Clone)]
pub struct Logger {
    dispatch: Dispatch,
}

impl Logger {
    pub fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// A logger that drops every event.
    pub fn discard() -> Self {
        Self {
            dispatch: Dispatch::none(),
        }
    }

    /// Install `logger` as the fallback returned by [`Logger::process_default`].
    ///
    /// Meant to be called once from `main`; a second call fails and leaves
    /// the first logger in place.
    pub fn install_default(logger: Logger) -> Result<(), LoggingError> {
        PROCESS_DEFAULT
            .set(logger)
            .map_err(|_| LoggingError::DefaultAlreadySet)
    }

    /// The installed fallback logger, or a discarding one.
    pub fn process_default() -> Logger {
        PROCESS_DEFAULT.get().cloned().unwrap_or_else(Logger::discard)
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Run `fut` with this logger as its default subscriber.
    ///
    /// Tasks spawned from inside `fut` must opt in with
    /// `WithSubscriber::with_current_subscriber`.
    pub fn scope<F: Future>(&self, fut: F) -> WithDispatch<F> {
        fut.with_subscriber(self.dispatch.clone())
    }

    /// Run a synchronous closure with this logger as the default subscriber.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}

/// Build a logger writing to `writer`.
pub fn build_logger<W>(config: &LogConfig, writer: W) -> Result<Logger, LoggingError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let filter = EnvFilter::try_new(config.level.as_str())?;

    let dispatch = match config.format {
        LogFormat::Json => {
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(true)
                .with_span_list(false)
                .with_timer(Rfc3339Millis)
                .with_writer(writer)
                .with_filter(filter);
            Dispatch::new(tracing_subscriber::registry().with(layer))
        }
        LogFormat::Text => {
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_timer(Rfc3339Millis)
                .with_writer(writer)
                .with_filter(filter);
            Dispatch::new(tracing_subscriber::registry().with(layer))
        }
    };

    Ok(Logger::new(dispatch))
}
