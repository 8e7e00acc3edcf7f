//! Service toolkit built around a managed HTTP listener lifecycle.
//!
//! The core is [`lifecycle::serve`]: bind a port, serve a router until the
//! caller's context is canceled, then drain within a grace period, telling a
//! clean stop apart from a failure such as the port already being taken.

pub mod app;
pub mod buildinfo;
pub mod cli;
pub mod config;
pub mod error;
pub mod golden;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod resilience;

pub use app::App;
pub use config::ServiceConfig;
pub use error::AppError;
pub use http::ServerDescriptor;
pub use lifecycle::{serve, Lifecycle, ServeContext, ServeError};
pub use observability::Logger;
