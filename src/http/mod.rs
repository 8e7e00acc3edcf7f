//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Accepted TCP connection
//!     → server.rs (HTTP/1.1 connection, timeouts, middleware)
//!     → caller's Router (opaque request handler)
//!     → Send to client
//!
//! Outbound:
//!     client.rs (reqwest client with hardened timeouts)
//! ```

pub mod client;
pub mod server;

pub use client::{client_builder, new_client};
pub use server::{HttpServer, ServerDescriptor};
