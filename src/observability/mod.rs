//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle and handlers produce:
//!     → logging.rs (leveled, keyed events through an injected Logger)
//!
//! Consumers:
//!     → stdout (JSON lines in production)
//!     → logbuf.rs (in-memory sink for assertions)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Logger is passed explicitly, never installed as the global subscriber

pub mod logbuf;
pub mod logging;

pub use logbuf::LogBuffer;
pub use logging::{build_logger, LogConfig, LogFormat, LogLevel, Logger, LoggingError};
