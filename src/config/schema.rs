//! Configuration schema definitions.
//!
//! Flags are declared with clap; [`envflag`](super::envflag) fills in any
//! flag missing from the command line from the environment. The resolved
//! config serializes to JSON for the start-up log line.

use clap::Parser;
use serde::Serialize;

use crate::buildinfo::BuildInfo;
use crate::config::{envflag, ConfigError};
use crate::observability::{LogConfig, LogFormat, LogLevel};

/// Command-line surface of the service.
#[derive(Debug, Clone, Parser)]
#[command(about = "HTTP service skeleton with a managed listener lifecycle")]
pub struct ServiceArgs {
    /// Network port to listen on (0 picks a free port).
    #[arg(long, default_value_t = 8000)]
    pub port: u16,

    /// Logging level.
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log line encoding.
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    pub log_format: LogFormat,
}

/// Resolved service configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceConfig {
    /// Program name, taken from the first argument.
    pub app_name: String,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub port: u16,
    pub build: BuildInfo,
}

impl ServiceConfig {
    /// Build the config from the full argument list (program name first) and
    /// `NAME=value` environment entries.
    pub fn from_args_env(args: &[String], env: &[String]) -> Result<Self, ConfigError> {
        let app_name = args.first().ok_or(ConfigError::NoArgs)?.clone();
        let parsed: ServiceArgs = envflag::parse(args, env)?;

        Ok(Self {
            app_name,
            log_level: parsed.log_level,
            log_format: parsed.log_format,
            port: parsed.port,
            build: BuildInfo::current(),
        })
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level,
            format: self.log_format,
        }
    }
}
