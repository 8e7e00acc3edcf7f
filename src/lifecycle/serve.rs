//! Managed HTTP listener lifecycle.
//!
//! # State Machine
//! ```text
//! Starting → Running → ShuttingDown → Stopped
//!     └────→ Failed (bind error)
//! ```
//!
//! Two activities run concurrently inside one invocation:
//! - accept: bind, then accept and serve connections until the local context
//!   is canceled; a fatal error cancels the local context itself
//! - shutdown watcher: wait for cancellation, then drain connections under a
//!   deadline that does not inherit the fired cancellation
//!
//! Both are joined before either outcome is read.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::task::TaskTracker;
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

use crate::http::{HttpServer, ServerDescriptor};
use crate::lifecycle::context::{ContextError, ServeContext};
use crate::net::listener::is_transient_accept_error;
use crate::net::{Listener, ListenerError};
use crate::resilience::backoff::Backoff;

/// Error returned from a lifecycle invocation.
#[derive(Debug, Error)]
pub enum ServeError {
    /// The listener could not be established or failed while serving.
    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// Draining failed; only returned when strict shutdown is enabled.
    #[error("shutdown: {0}")]
    Shutdown(#[from] ShutdownError),
}

impl ServeError {
    /// Whether the server could not bind because the address is taken.
    pub fn is_addr_in_use(&self) -> bool {
        matches!(
            self,
            ServeError::Listener(ListenerError::Bind { source, .. })
                if source.kind() == std::io::ErrorKind::AddrInUse
        )
    }
}

/// Error from the shutdown phase.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ShutdownError {
    #[error("grace period of {grace:?} exceeded with {in_flight} connection(s) still open")]
    GraceExceeded { grace: Duration, in_flight: usize },
}

/// Run `router` on all interfaces at `port` until `ctx` is canceled.
///
/// Uses the default [`ServerDescriptor`] and lenient shutdown: a slow drain is
/// logged but not returned.
pub async fn serve(ctx: &ServeContext, port: u16, router: Router) -> Result<(), ServeError> {
    Lifecycle::new(ServerDescriptor::new(port)).run(ctx, router).await
}

/// Configurable form of [`serve`].
#[derive(Debug, Clone)]
pub struct Lifecycle {
    descriptor: ServerDescriptor,
    strict_shutdown: bool,
    bound: Arc<watch::Sender<Option<SocketAddr>>>,
}

impl Lifecycle {
    pub fn new(descriptor: ServerDescriptor) -> Self {
        Self {
            descriptor,
            strict_shutdown: false,
            bound: Arc::new(watch::Sender::new(None)),
        }
    }

    /// When set, a failed drain is returned as [`ServeError::Shutdown`]
    /// instead of only being logged.
    pub fn strict_shutdown(mut self, strict: bool) -> Self {
        self.strict_shutdown = strict;
        self
    }

    pub fn descriptor(&self) -> &ServerDescriptor {
        &self.descriptor
    }

    /// Observe the address the listener actually bound to, which differs
    /// from the descriptor when port 0 was requested. Holds `None` until the
    /// bind succeeds.
    pub fn bound_addr(&self) -> watch::Receiver<Option<SocketAddr>> {
        self.bound.subscribe()
    }

    /// Serve until `ctx` is canceled or serving fails.
    pub async fn run(&self, ctx: &ServeContext, router: Router) -> Result<(), ServeError> {
        let port = self.descriptor.addr.port();
        let logger = ctx.logger().clone();
        // The span must belong to the same logger as the events inside it.
        let span = logger.in_scope(|| tracing::info_span!("http", component = "http", port));

        logger
            .scope(self.run_scoped(ctx, router).instrument(span))
            .await
    }

    async fn run_scoped(&self, ctx: &ServeContext, router: Router) -> Result<(), ServeError> {
        // Canceled by the caller's context, or by the accept side on failure.
        let local = ctx.child();
        let server = HttpServer::new(self.descriptor, router, local.token().clone());
        let connections = TaskTracker::new();
        // Fired only when the grace period runs out.
        let abandon = local.without_cancel();

        tracing::info!(port = self.descriptor.addr.port(), "HTTP service starting");

        let (serve_outcome, shutdown_outcome) = tokio::join!(
            accept_connections(&server, &local, &abandon, &connections, &self.bound),
            watch_shutdown(&local, &abandon, &connections, self.descriptor.shutdown_grace),
        );

        serve_outcome?;

        if let Err(e) = shutdown_outcome {
            tracing::error!(error = %e, "during shutdown");
            if self.strict_shutdown {
                return Err(e.into());
            }
        }

        tracing::info!("HTTP service stopped");
        Ok(())
    }
}

/// Accept side: bind, then accept until the local context is canceled.
///
/// Always closes `connections` on the way out, so the watcher's drain can
/// complete.
async fn accept_connections(
    server: &HttpServer,
    local: &ServeContext,
    abandon: &ServeContext,
    connections: &TaskTracker,
    bound: &watch::Sender<Option<SocketAddr>>,
) -> Result<(), ServeError> {
    let result = accept_loop(server, local, abandon, connections, bound).await;
    connections.close();

    if let Err(e) = &result {
        tracing::error!(error = %e, "HTTP service returned abnormally, stopping app");
        local.cancel();
    }
    result
}

async fn accept_loop(
    server: &HttpServer,
    local: &ServeContext,
    abandon: &ServeContext,
    connections: &TaskTracker,
    bound: &watch::Sender<Option<SocketAddr>>,
) -> Result<(), ServeError> {
    let listener = Listener::bind(server.descriptor().addr).await?;
    tracing::info!(address = %listener.local_addr(), "HTTP service listening");
    bound.send_replace(Some(listener.local_addr()));

    let mut backoff = Backoff::for_accept();

    loop {
        let accepted = tokio::select! {
            biased;
            _ = local.cancelled() => {
                tracing::debug!("closing listener on clean shutdown");
                return Ok(());
            }
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer)) => {
                backoff.reset();
                let server = server.clone();
                let drain = local.token().clone();
                let abandon = abandon.token().clone();
                let span = tracing::debug_span!("conn", peer_addr = %peer);
                connections.spawn(
                    async move { server.serve_connection(stream, peer, drain, abandon).await }
                        .instrument(span)
                        .with_current_subscriber(),
                );
            }
            Err(e) if is_transient_accept_error(e.io_error()) => {
                let delay = backoff.next_delay();
                tracing::warn!(error = %e, retry_in = ?delay, "Accept failed, retrying");
                tokio::select! {
                    _ = local.cancelled() => {}
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Shutdown side: wait for cancellation, then drain within `grace`.
async fn watch_shutdown(
    local: &ServeContext,
    abandon: &ServeContext,
    connections: &TaskTracker,
    grace: Duration,
) -> Result<(), ShutdownError> {
    local.cancelled().await;
    tracing::info!("HTTP service shutting down on cancel");

    // `local` has already fired; the drain needs a live context of its own.
    let drain = local.without_cancel().with_timeout(grace);
    match drain.run(connections.wait()).await {
        Ok(()) => Ok(()),
        Err(ContextError::DeadlineExceeded) | Err(ContextError::Canceled) => {
            let in_flight = connections.len();
            abandon.cancel();
            Err(ShutdownError::GraceExceeded { grace, in_flight })
        }
    }
}
