//! HTTP server setup and per-connection serving.
//!
//! # Responsibilities
//! - Hold the fixed server descriptor (address and timeouts)
//! - Wrap the caller's router with the request-level middleware
//! - Serve one accepted TCP connection over HTTP/1.1
//! - Drain a connection on shutdown, drop it when the grace period is over

use std::net::SocketAddr;
use std::time::Duration;

use axum::{Extension, Router};
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::net::{all_interfaces, ConnectionId, IdleTimeout};

/// Time allowed for a client to send a complete request head.
pub const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(1);
/// Absolute ceiling on producing one response.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);
/// How long a keep-alive connection may sit without traffic.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);
/// How long shutdown waits for in-flight connections.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Address and timeout policy of one server instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerDescriptor {
    pub addr: SocketAddr,
    pub header_read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
    pub shutdown_grace: Duration,
}

impl ServerDescriptor {
    /// All interfaces on `port`, with the default timeout policy.
    pub fn new(port: u16) -> Self {
        Self {
            addr: all_interfaces(port),
            header_read_timeout: DEFAULT_HEADER_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_header_read_timeout(mut self, timeout: Duration) -> Self {
        self.header_read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// The idle clock also runs while a handler is working, so the value in
    /// effect is never below the write timeout; see
    /// [`ServerDescriptor::connection_idle_timeout`].
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Idle limit applied to each connection: `idle_timeout`, raised to
    /// `write_timeout` so a request still within its write budget is not
    /// cut off as idle.
    pub fn connection_idle_timeout(&self) -> Duration {
        self.idle_timeout.max(self.write_timeout)
    }
}

/// Router plus descriptor, ready to serve accepted connections.
#[derive(Clone)]
pub struct HttpServer {
    descriptor: ServerDescriptor,
    app: Router,
}

impl HttpServer {
    /// Wrap `router` with the server's middleware.
    ///
    /// `cancel` is inserted into every request's extensions so handlers can
    /// extract `Extension<CancellationToken>` and stop early on shutdown.
    pub fn new(descriptor: ServerDescriptor, router: Router, cancel: CancellationToken) -> Self {
        let app = Self::build_router(&descriptor, router, cancel);
        Self { descriptor, app }
    }

    #[allow(deprecated)]
    fn build_router(descriptor: &ServerDescriptor, router: Router, cancel: CancellationToken) -> Router {
        router
            .layer(TimeoutLayer::new(descriptor.write_timeout))
            .layer(Extension(cancel))
            .layer(TraceLayer::new_for_http())
    }

    pub fn descriptor(&self) -> &ServerDescriptor {
        &self.descriptor
    }

    /// Serve one connection until the peer goes away, it idles out, or
    /// shutdown intervenes.
    ///
    /// Once `drain` fires the connection finishes its current request and
    /// closes. Once `abandon` fires it is dropped regardless.
    pub async fn serve_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        drain: CancellationToken,
        abandon: CancellationToken,
    ) {
        let id = ConnectionId::new();
        let idle = self.descriptor.connection_idle_timeout();
        let io = TokioIo::new(IdleTimeout::new(stream, idle));
        let service = TowerToHyperService::new(self.app.clone());

        let conn = http1::Builder::new()
            .timer(TokioTimer::new())
            .header_read_timeout(self.descriptor.header_read_timeout)
            .keep_alive(true)
            .serve_connection(io, service);
        tokio::pin!(conn);

        let result = tokio::select! {
            result = conn.as_mut() => result,
            _ = drain.cancelled() => {
                conn.as_mut().graceful_shutdown();
                tokio::select! {
                    result = conn.as_mut() => result,
                    _ = abandon.cancelled() => {
                        tracing::debug!(connection_id = %id, peer_addr = %peer, "Connection abandoned after grace period");
                        return;
                    }
                }
            }
        };

        match result {
            Ok(()) => tracing::trace!(connection_id = %id, "Connection closed"),
            Err(e) => tracing::debug!(
                connection_id = %id,
                peer_addr = %peer,
                error = %e,
                "Connection error"
            ),
        }
    }
}
