//! Composition root: configuration, instance identity, renderers, router.

use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use badgeserve_lib::config::InstanceIdFrom;
use badgeserve_lib::{
    ConfigError, Dispatcher, InstanceMetadata, ServiceRegistry, ValidatedConfig, Validator,
};
use serde_json::Value;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handler::badge_handler;
use crate::health::{health_live, health_ready};
use crate::metrics::{metrics_handler, MetricsConfig};
use crate::middleware::MetricsLayer;
use crate::AppState;

/// A validated, ready-to-route badge server.
///
/// Construction is the only point where configuration can fail; a `Server`
/// that exists is fully configured.
#[derive(Debug, Clone)]
pub struct Server {
    config: Arc<ValidatedConfig>,
    instance: InstanceMetadata,
    registry: Arc<ServiceRegistry>,
}

impl Server {
    /// Validate both configuration tiers and resolve the instance id from
    /// configuration.
    pub fn new(public: &Value, private: &Value) -> Result<Self, ConfigError> {
        Self::build(public, private, None, |name| std::env::var(name).ok())
    }

    /// Like [`Server::new`], but `instance_id` takes precedence over any
    /// configured source.
    pub fn with_instance_id(
        public: &Value,
        private: &Value,
        instance_id: &str,
    ) -> Result<Self, ConfigError> {
        Self::build(public, private, Some(instance_id), |name| {
            std::env::var(name).ok()
        })
    }

    /// Full constructor with an injectable environment lookup.
    pub fn build<F>(
        public: &Value,
        private: &Value,
        instance_id: Option<&str>,
        env: F,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Validator::default().validate(public, private)?;
        let instance = resolve_instance(&config, instance_id, env);

        info!(
            instance_id = %instance.id,
            redirect = config.redirect_url().is_some(),
            raster = config.raster_url().is_some(),
            "server configured"
        );

        Ok(Self {
            config: Arc::new(config),
            instance,
            registry: Arc::new(ServiceRegistry::builtin()),
        })
    }

    /// Replace the renderer registry.
    pub fn with_registry(mut self, registry: ServiceRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn instance_metadata(&self) -> &InstanceMetadata {
        &self.instance
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn metrics_config(&self) -> MetricsConfig {
        MetricsConfig::from_config(&self.config.public, &self.instance)
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(Arc::clone(&self.config), Arc::clone(&self.registry))
    }

    /// Build the axum router.
    ///
    /// `/health/*` always, `/metrics` when the Prometheus endpoint is enabled,
    /// and the badge handler for everything else.
    pub fn router(&self) -> Router {
        let state = AppState::new(self.dispatcher(), self.instance.clone());

        let mut router = Router::new()
            .route("/health/live", get(health_live))
            .route("/health/ready", get(health_ready));

        if self.metrics_config().endpoint_enabled {
            router = router.route("/metrics", get(metrics_handler));
        }

        let mut router = router
            .fallback(badge_handler)
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(MetricsLayer::for_registry(&self.registry));

        if let Some(cors) = self.cors_layer() {
            router = router.layer(cors);
        }

        router
    }

    fn cors_layer(&self) -> Option<CorsLayer> {
        let origins: Vec<HeaderValue> = self
            .config
            .public
            .cors
            .allowed_origin
            .iter()
            .filter_map(|origin| HeaderValue::from_str(origin).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        Some(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::HEAD]),
        )
    }

    /// Bind the configured address and serve until the listener fails.
    pub async fn serve(self) -> std::io::Result<()> {
        let bind = &self.config.public.bind;
        let listener = tokio::net::TcpListener::bind((bind.address.as_str(), bind.port)).await?;
        info!(addr = %listener.local_addr()?, instance_id = %self.instance.id, "listening");

        axum::serve(listener, self.router()).await
    }
}

fn resolve_instance<F>(config: &ValidatedConfig, explicit: Option<&str>, env: F) -> InstanceMetadata
where
    F: Fn(&str) -> Option<String>,
{
    if explicit.is_some_and(|id| !id.is_empty()) {
        return InstanceMetadata::resolve(explicit);
    }

    let influx = &config.public.metrics.influx;
    let from_env = match influx.instance_id_from {
        InstanceIdFrom::EnvVar => influx.instance_id_env_var_name.as_deref().and_then(&env),
        InstanceIdFrom::Random => None,
    };

    InstanceMetadata::resolve(from_env.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn public() -> Value {
        json!({"bind": {"port": 0, "address": "127.0.0.1"}})
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_explicit_instance_id_is_verbatim() {
        let server = Server::with_instance_id(&public(), &json!({}), "Worker-7").unwrap();
        assert_eq!(server.instance_metadata().id, "Worker-7");
    }

    #[test]
    fn test_whitespace_instance_id_is_verbatim() {
        let server = Server::with_instance_id(&public(), &json!({}), " ").unwrap();
        assert_eq!(server.instance_metadata().id, " ");

        let server = Server::with_instance_id(&public(), &json!({}), "").unwrap();
        assert_eq!(server.instance_metadata().id.len(), 36);
    }

    #[test]
    fn test_generated_instance_ids_differ() {
        let a = Server::build(&public(), &json!({}), None, no_env).unwrap();
        let b = Server::build(&public(), &json!({}), None, no_env).unwrap();
        assert!(!a.instance_metadata().id.is_empty());
        assert_ne!(a.instance_metadata(), b.instance_metadata());
    }

    #[test]
    fn test_instance_id_from_env_var() {
        let mut public = public();
        public["metrics"] = json!({
            "influx": {"instanceIdFrom": "env-var", "instanceIdEnvVarName": "HOSTNAME"}
        });
        let server = Server::build(&public, &json!({}), None, |name| {
            (name == "HOSTNAME").then(|| "badge-host-3".to_string())
        })
        .unwrap();
        assert_eq!(server.instance_metadata().id, "badge-host-3");
    }

    #[test]
    fn test_explicit_id_beats_env_var() {
        let mut public = public();
        public["metrics"] = json!({
            "influx": {"instanceIdFrom": "env-var", "instanceIdEnvVarName": "HOSTNAME"}
        });
        let server = Server::build(&public, &json!({}), Some("explicit"), |_| {
            Some("from-env".to_string())
        })
        .unwrap();
        assert_eq!(server.instance_metadata().id, "explicit");
    }

    #[test]
    fn test_unset_env_var_falls_back_to_random() {
        let mut public = public();
        public["metrics"] = json!({
            "influx": {"instanceIdFrom": "env-var", "instanceIdEnvVarName": "UNSET"}
        });
        let server = Server::build(&public, &json!({}), None, no_env).unwrap();
        assert_eq!(server.instance_metadata().id.len(), 36);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut public = public();
        public["metrics"] = json!({"influx": {"enabled": true}});
        let err = Server::new(&public, &json!({})).unwrap_err();
        assert!(err.to_string().contains("\"metrics.influx.uri\" is required"));
    }

    #[test]
    fn test_disabled_partial_influx_is_accepted() {
        let mut public = public();
        public["metrics"] = json!({
            "influx": {"enabled": false, "uri": "https://influx.example.com"}
        });
        let server = Server::new(&public, &json!({})).unwrap();
        assert!(!server.config().public.metrics.influx.enabled);
    }

    #[test]
    fn test_with_registry_replaces_renderers() {
        let server = Server::new(&public(), &json!({}))
            .unwrap()
            .with_registry(ServiceRegistry::new());
        assert!(server.registry().is_empty());
    }
}
