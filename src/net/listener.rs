//! TCP listener implementation.
//!
//! # Responsibilities
//! - Bind to all interfaces on the requested port
//! - Accept incoming TCP connections
//! - Classify accept errors into transient (retry) and fatal

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("listen tcp {addr}: bind: {}", bind_reason(.source))]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Failed to accept connection.
    #[error("accept tcp {addr}: {source}")]
    Accept {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl ListenerError {
    /// The underlying I/O error.
    pub fn io_error(&self) -> &io::Error {
        match self {
            ListenerError::Bind { source, .. } | ListenerError::Accept { source, .. } => source,
        }
    }
}

/// Common bind failures in the wording operators grep logs for, without the
/// platform's capitalization and `(os error N)` suffix.
fn bind_reason(err: &io::Error) -> String {
    match err.kind() {
        io::ErrorKind::AddrInUse => "address already in use".to_string(),
        io::ErrorKind::AddrNotAvailable => "cannot assign requested address".to_string(),
        io::ErrorKind::PermissionDenied => "permission denied".to_string(),
        _ => err.to_string(),
    }
}

/// Address for serving on every interface at `port`.
pub fn all_interfaces(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}

/// A bound TCP listener. Dropping it closes the socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `addr`. Port 0 asks the OS for an ephemeral port.
    pub async fn bind(addr: SocketAddr) -> Result<Self, ListenerError> {
        let inner = TcpListener::bind(addr)
            .await
            .map_err(|source| ListenerError::Bind { addr, source })?;

        let local_addr = inner
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;

        tracing::debug!(address = %local_addr, "Listener bound");

        Ok(Self { inner, local_addr })
    }

    /// Accept a new connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        let (stream, peer) = self
            .inner
            .accept()
            .await
            .map_err(|source| ListenerError::Accept {
                addr: self.local_addr,
                source,
            })?;

        tracing::trace!(peer_addr = %peer, "Connection accepted");

        Ok((stream, peer))
    }

    /// The address this listener is bound to (with the real port when 0 was
    /// requested).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

/// Whether an accept error affects only one connection or a temporarily
/// exhausted resource, so the accept loop should back off and continue.
pub fn is_transient_accept_error(err: &io::Error) -> bool {
    use io::ErrorKind::*;

    if matches!(
        err.kind(),
        ConnectionAborted | ConnectionReset | ConnectionRefused | Interrupted | WouldBlock | TimedOut
    ) {
        return true;
    }

    // EMFILE / ENFILE: out of file descriptors, may clear once connections close.
    matches!(err.raw_os_error(), Some(23) | Some(24))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ephemeral_port_is_resolved() {
        let listener = Listener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .await
            .unwrap();
        assert_ne!(listener.local_addr().port(), 0);
    }

    #[tokio::test]
    async fn second_bind_reports_addr_in_use() {
        let first = Listener::bind(all_interfaces(0)).await.unwrap();
        let port = first.local_addr().port();

        let err = Listener::bind(all_interfaces(port)).await.unwrap_err();
        assert_eq!(err.io_error().kind(), io::ErrorKind::AddrInUse);
        assert!(matches!(err, ListenerError::Bind { addr, .. } if addr.port() == port));
        assert_eq!(
            err.to_string(),
            format!("listen tcp 0.0.0.0:{port}: bind: address already in use")
        );
    }

    #[test]
    fn other_bind_errors_keep_the_os_text() {
        let err = ListenerError::Bind {
            addr: all_interfaces(1),
            source: io::Error::other("boom"),
        };
        assert_eq!(err.to_string(), "listen tcp 0.0.0.0:1: bind: boom");
    }

    #[test]
    fn transient_errors() {
        assert!(is_transient_accept_error(&io::Error::from(
            io::ErrorKind::ConnectionAborted
        )));
        assert!(is_transient_accept_error(&io::Error::from_raw_os_error(24)));
        assert!(!is_transient_accept_error(&io::Error::from(
            io::ErrorKind::PermissionDenied
        )));
    }
}
