//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! argv + environment
//!     → envflag.rs (clap parse, env fallback per flag)
//!     → schema.rs (ServiceConfig, immutable)
//!     → passed by value to app setup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - Every flag has a default so an empty environment is valid
//! - Arguments and environment are parameters, never read from the process
//!   here, so tests can supply their own

pub mod envflag;
pub mod schema;

use thiserror::Error;

pub use schema::{ServiceArgs, ServiceConfig};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Even with no flags, the program name is expected as the first argument.
    #[error("missing args, pass in the full argument list")]
    NoArgs,

    #[error("unexpected environment entry {entry:?}")]
    Env { entry: String },

    #[error("parsing arguments: {0}")]
    Args(#[from] clap::Error),
}
