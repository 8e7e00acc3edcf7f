//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept, error classification)
//!     → connection.rs (connection id, idle timeout)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - Dropping the listener is how the accept side is closed
//! - Transient accept errors never end the accept loop

pub mod connection;
pub mod listener;

pub use connection::{ConnectionId, IdleTimeout};
pub use listener::{all_interfaces, Listener, ListenerError};
