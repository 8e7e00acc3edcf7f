//! svckit service binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv + env ──▶ config ──▶ logger ──▶ router
//!                                          │
//!   SIGINT/SIGTERM ──▶ root token ──▶ lifecycle::serve
//!                                     ┌────┴─────┐
//!                                   accept   shutdown watcher
//!                                     └────┬─────┘
//!                                        join ──▶ exit code
//! ```

use std::process::ExitCode;

use svckit::lifecycle::signals::shutdown_token;
use svckit::{App, Logger};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args_os()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let env: Vec<String> = std::env::vars_os()
        .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
        .collect();

    let app = match App::new(std::io::stdout, &args, &env) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // Signal handling and anything else without an explicit logger use this one.
    if let Err(e) = Logger::install_default(app.logger().clone()) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let token = match shutdown_token() {
        Ok(token) => token,
        Err(e) => {
            eprintln!("installing signal handlers: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = app.run(token).await {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
