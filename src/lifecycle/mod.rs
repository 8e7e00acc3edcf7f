//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → cancel root token
//!
//! Context (context.rs):
//!     root token → child context per serve call → detached drain deadline
//!
//! Serve (serve.rs):
//!     Bind → Accept/serve ‖ Watch for cancel → Stop accepting → Drain → Join
//! ```
//!
//! # Design Decisions
//! - Startup failures are fatal and returned to the caller
//! - Ordered shutdown: stop accept, drain, close
//! - Shutdown has a deadline: connections still open afterwards are dropped

pub mod context;
pub mod serve;
pub mod signals;

pub use context::{ContextError, ServeContext};
pub use serve::{serve, Lifecycle, ServeError, ShutdownError};
