//! Top-level error type for running the service.

use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::ServeError;
use crate::observability::LoggingError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("couldn't load config: {0}")]
    Config(#[from] ConfigError),

    #[error("couldn't set up logging: {0}")]
    Logging(#[from] LoggingError),

    #[error(transparent)]
    Serve(#[from] ServeError),
}
