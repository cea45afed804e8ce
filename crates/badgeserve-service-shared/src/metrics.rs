//! Prometheus metrics for the badge service.
//!
//! This module provides:
//! - [`MetricsConfig`]: derived from the `metrics.prometheus` configuration
//! - [`init_metrics`]: install the Prometheus recorder with the instance label
//! - [`metrics_handler`]: Axum handler for the `/metrics` endpoint
//! - Business metric helpers for badge outcomes

use badgeserve_lib::{InstanceMetadata, PublicConfig};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Global Prometheus handle for rendering metrics.
static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Whether metrics collection is enabled.
    pub enabled: bool,
    /// Whether `/metrics` is routed.
    pub endpoint_enabled: bool,
    /// Value of the global `instance` label.
    pub instance_id: String,
}

impl MetricsConfig {
    pub fn from_config(public: &PublicConfig, instance: &InstanceMetadata) -> Self {
        let prometheus = &public.metrics.prometheus;
        Self {
            enabled: prometheus.enabled,
            endpoint_enabled: prometheus.enabled && prometheus.endpoint_enabled,
            instance_id: instance.id.clone(),
        }
    }
}

/// Install the Prometheus recorder.
///
/// Must be called once, before any metric is recorded. Every series carries
/// an `instance` label with the configured instance id.
///
/// # Errors
///
/// Returns an error if metrics are disabled, the recorder is already
/// installed, or the builder fails.
pub fn init_metrics(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        return Err(MetricsError::Disabled);
    }
    if PROMETHEUS_HANDLE.get().is_some() {
        return Err(MetricsError::AlreadyInitialized);
    }

    let handle = PrometheusBuilder::new()
        .add_global_label("instance", config.instance_id.clone())
        .install_recorder()
        .map_err(|e| MetricsError::InstallFailed(e.to_string()))?;

    PROMETHEUS_HANDLE
        .set(handle)
        .map_err(|_| MetricsError::AlreadyInitialized)?;

    describe_badge_metrics();
    Ok(())
}

/// Returns `None` if [`init_metrics`] has not been called.
pub fn prometheus_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

/// Axum handler for the `/metrics` endpoint.
pub async fn metrics_handler() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# Metrics not initialized\n".to_string())
}

/// Why [`init_metrics`] did not install a recorder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    #[error("metrics are disabled")]
    Disabled,
    #[error("metrics recorder already initialized")]
    AlreadyInitialized,
    #[error("failed to install metrics recorder: {0}")]
    InstallFailed(String),
}

fn describe_badge_metrics() {
    metrics::describe_counter!(
        "badgeserve_badges_rendered_total",
        "Badges rendered by a renderer, by category and format"
    );
    metrics::describe_counter!(
        "badgeserve_redirects_total",
        "Redirects issued for the root path and legacy raster formats"
    );
    metrics::describe_counter!(
        "badgeserve_fallbacks_total",
        "Stand-in badges served instead of a rendered badge"
    );
    metrics::describe_histogram!(
        "badgeserve_http_request_duration_seconds",
        metrics::Unit::Seconds,
        "Time from request to response head"
    );
}

/// Increments `badgeserve_badges_rendered_total`.
///
/// # Arguments
///
/// * `category` - Renderer category (e.g., "badge", "static", or "_root")
/// * `format` - Response format (e.g., "svg", "json")
pub fn record_badge_rendered(category: &str, format: &str) {
    metrics::counter!(
        "badgeserve_badges_rendered_total",
        "category" => category.to_string(),
        "format" => format.to_string()
    )
    .increment(1);
}

/// Increments `badgeserve_redirects_total`.
///
/// * `kind` - "root" or "legacy_raster"
pub fn record_redirect(kind: &str) {
    metrics::counter!(
        "badgeserve_redirects_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Increments `badgeserve_fallbacks_total` for every stand-in badge served.
///
/// * `reason` - "not_found", "obsolete_format", or "render_failed"
pub fn record_fallback(reason: &str) {
    metrics::counter!(
        "badgeserve_fallbacks_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}
