//! Execution context shared by the lifecycle activities.
//!
//! A [`ServeContext`] bundles three things:
//! - a cancellation token (irreversible "please stop" signal)
//! - the logger capability events should be emitted through
//! - an optional deadline bounding whatever runs under it
//!
//! # Design Decisions
//! - Derivation is explicit: [`ServeContext::child`] inherits cancellation,
//!   [`ServeContext::without_cancel`] keeps the logger and drops both the
//!   parent's cancellation and its deadline.
//! - A context whose token already fired cannot bound a new operation, so the
//!   shutdown path always starts from `without_cancel()`.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::observability::logging::Logger;

/// Why a context-bounded operation did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Cancellable execution context with an attached logger.
#[derive(Debug, Clone)]
pub struct ServeContext {
    token: CancellationToken,
    logger: Logger,
    deadline: Option<Instant>,
}

impl ServeContext {
    /// Root context driven by `token`, logging through the process default
    /// logger (or nowhere, if none was installed).
    pub fn new(token: CancellationToken) -> Self {
        Self {
            token,
            logger: Logger::process_default(),
            deadline: None,
        }
    }

    /// Replace the logger carried by this context.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    /// Derive a context that is canceled whenever this one is, and that can
    /// additionally be canceled on its own without touching the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            logger: self.logger.clone(),
            deadline: self.deadline,
        }
    }

    /// Derive a fresh, live context that keeps the logger but none of the
    /// parent's cancellation state or deadline.
    pub fn without_cancel(&self) -> Self {
        Self {
            token: CancellationToken::new(),
            logger: self.logger.clone(),
            deadline: None,
        }
    }

    /// Bound this context by `timeout` from now. An earlier existing deadline
    /// is kept.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    /// Cancel this context and every context derived from it via `child`.
    /// Repeated calls are no-ops.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until this context is canceled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `fut` until it completes, the context is canceled, or the
    /// deadline passes. Cancellation wins over an expired deadline when both
    /// are ready.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if self.token.is_cancelled() {
            return Err(ContextError::Canceled);
        }

        let expiry = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(ContextError::Canceled),
            out = fut => Ok(out),
            _ = expiry => Err(ContextError::DeadlineExceeded),
        }
    }
}
