//! badgeserve HTTP service.
//!
//! # Endpoints
//!
//! - `GET /` - Redirect to the configured landing page
//! - `GET /<category>/<subject>.<svg|json>` - Rendered badge
//! - `GET /:<label>-<message>-<color>.<svg|json>` - Colorscheme badge without a category
//! - `GET /<category>/<subject>.<png|gif>` - Redirect to the raster host
//! - `GET /metrics` - Prometheus metrics (when enabled)
//! - `GET /health/live` - Liveness check
//! - `GET /health/ready` - Readiness check
//!
//! # Configuration
//!
//! - `BADGESERVE_CONFIG_DIR` - Directory holding `default.yml` and an
//!   optional `local.yml` (default: `config`)
//! - `PORT`, `BIND_ADDRESS`, `REDIRECT_URL`, `RASTER_URL`, `INFLUX_*`,
//!   `METRICS_*` - Overrides applied over the files
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text

use anyhow::Context;
use badgeserve_lib::ConfigLoader;
use badgeserve_service_shared::{init_logging, init_metrics, LoggingConfig, MetricsError, Server};
use tracing::{error, info, warn};

const DEFAULT_CONFIG_DIR: &str = "config";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env().with_service("badgeserve");
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("failed to initialize logging: {e}");
    }

    let config_dir =
        std::env::var("BADGESERVE_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    info!(config_dir = %config_dir, "loading configuration");

    let raw = ConfigLoader::new(&config_dir).load().map_err(|e| {
        error!(error = %e, config_dir = %config_dir, "failed to load configuration");
        e
    })?;

    let server = Server::new(&raw.public, &raw.private).map_err(|e| {
        error!(error = %e, "configuration rejected");
        e
    })?;

    match init_metrics(&server.metrics_config()) {
        Ok(()) => info!("prometheus metrics enabled"),
        Err(MetricsError::Disabled) => info!("prometheus metrics disabled"),
        // Metrics are optional; keep serving without them.
        Err(e) => warn!(error = %e, "failed to initialize metrics, continuing without metrics"),
    }

    info!(
        instance_id = %server.instance_metadata().id,
        renderers = server.registry().len(),
        "starting badge service"
    );

    server.serve().await.context("server terminated")?;

    Ok(())
}
