//! Service skeleton: config, logger and router wired to the lifecycle.

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::MakeWriter;

use crate::buildinfo::BuildInfo;
use crate::config::ServiceConfig;
use crate::error::AppError;
use crate::lifecycle::{serve, ServeContext};
use crate::observability::{build_logger, Logger};

/// Body returned by the liveness probe.
pub const HEALTH_STATUS: &str = "I'm doing science and I'm still alive.";

/// A configured, not yet running service.
pub struct App {
    config: ServiceConfig,
    logger: Logger,
    router: Router,
}

impl App {
    /// Load config from `args`/`env` and build the logger (writing to
    /// `output`) and router.
    pub fn new<W>(output: W, args: &[String], env: &[String]) -> Result<Self, AppError>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let config = ServiceConfig::from_args_env(args, env)?;
        let logger = build_logger(&config.log_config(), output)?;

        logger.in_scope(|| tracing::debug!("creating HTTP router"));
        let router = build_router(config.build.clone());

        logger.in_scope(|| {
            tracing::info!(
                config = %serde_json::to_string(&config).unwrap_or_default(),
                "app setup complete"
            )
        });

        Ok(Self {
            config,
            logger,
            router,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Serve until `token` is canceled.
    pub async fn run(self, token: CancellationToken) -> Result<(), AppError> {
        let ctx = ServeContext::new(token).with_logger(self.logger.clone());
        serve(&ctx, self.config.port, self.router).await?;
        self.logger.in_scope(|| tracing::info!("exiting"));
        Ok(())
    }
}

/// Build and run the service in one call.
pub async fn run<W>(
    token: CancellationToken,
    output: W,
    args: &[String],
    env: &[String],
) -> Result<(), AppError>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    App::new(output, args, env)?.run(token).await
}

fn build_router(build: BuildInfo) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/version", get(move || version(build.clone())))
}

async fn healthz() -> Json<Value> {
    Json(json!({ "status": HEALTH_STATUS }))
}

async fn version(build: BuildInfo) -> Json<BuildInfo> {
    Json(build)
}
