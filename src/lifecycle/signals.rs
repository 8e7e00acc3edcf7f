//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT)
//! - Translate the first signal into cancellation of the root token
//! - Exit immediately on a second signal
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered before the token is handed out, so a signal
//!   arriving during start-up is not lost

use std::io;

use tokio_util::sync::CancellationToken;

use crate::observability::Logger;

/// Exit status used when a second signal forces the process down.
pub const FORCED_EXIT_CODE: i32 = 130;

/// Root cancellation token canceled by the first SIGINT or SIGTERM.
#[cfg(unix)]
pub fn shutdown_token() -> io::Result<CancellationToken> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        for round in 0..2 {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            let logger = Logger::process_default();
            if round == 0 {
                logger.in_scope(|| tracing::info!(signal = name, "Shutdown signal received"));
                trigger.cancel();
            } else {
                logger.in_scope(|| {
                    tracing::warn!(signal = name, "Second signal received, exiting immediately")
                });
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    });

    Ok(token)
}

/// Root cancellation token canceled by the first Ctrl+C.
#[cfg(not(unix))]
pub fn shutdown_token() -> io::Result<CancellationToken> {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            Logger::process_default().in_scope(|| tracing::info!("Shutdown signal received"));
            trigger.cancel();
        }
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(FORCED_EXIT_CODE);
        }
    });

    Ok(token)
}
