//! Structured logging for the badge service.
//!
//! Read from the environment at startup:
//!
//! - `LOG_FORMAT`: `json` (default) or `text`/`pretty`
//! - `RUST_LOG`: filter directives; falls back to [`DEFAULT_FILTER`]
//! - `SERVICE_NAME`: recorded on the startup event
//!
//! ```no_run
//! use badgeserve_service_shared::logging::{init_logging, LoggingConfig};
//!
//! init_logging(&LoggingConfig::from_env()).ok();
//! ```

use serde::{Deserialize, Serialize};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter used when `RUST_LOG` is unset or unparsable. Per-request access
/// logs come from the `MetricsLayer` span, so tower-http's own events are
/// kept quiet.
pub const DEFAULT_FILTER: &str = "info,tower_http=warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event, with the enclosing request span attached.
    #[default]
    Json,
    /// Multi-line human-readable output for local runs.
    Text,
}

impl LogFormat {
    /// `text` and `pretty` select [`LogFormat::Text`], case-insensitively;
    /// anything else is JSON.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("text") || s.eq_ignore_ascii_case("pretty") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Directives applied when `RUST_LOG` is absent.
    pub filter: String,
    pub service: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            filter: DEFAULT_FILTER.to_string(),
            service: None,
        }
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            format: get("LOG_FORMAT").map_or(defaults.format, |v| LogFormat::parse(&v)),
            filter: get("RUST_LOG").unwrap_or(defaults.filter),
            service: get("SERVICE_NAME"),
        }
    }

    /// Set the service name unless the environment already named one.
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service.get_or_insert_with(|| service.into());
        self
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed, for example when called twice.
///
/// ```json
/// {"timestamp":"2026-01-05T10:00:00Z","level":"INFO","fields":{"message":"request completed","status":200},"span":{"request_id":"...","name":"request"}}
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<(), TryInitError> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    match config.format {
        LogFormat::Text => registry.with(fmt::layer().pretty()).try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
    }

    tracing::info!(
        service = config.service.as_deref().unwrap_or("badgeserve"),
        format = ?config.format,
        filter = %config.filter,
        "logging initialized"
    );
    Ok(())
}
