//! Two-tier service configuration.
//!
//! Configuration arrives as two raw trees: a **public** tree holding
//! non-secret settings and a **private** tree holding credentials. Both are
//! kept as [`serde_json::Value`] until [`Validator`] has checked them, at which
//! point they become the typed, immutable [`ValidatedConfig`].
//!
//! Keys use camelCase, matching the YAML files read by [`ConfigLoader`].

mod loader;
mod rules;
mod validate;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use crate::error::Tier;
pub use loader::ConfigLoader;
pub use rules::{builtin_rules, SubsystemRule, Trigger};
pub use validate::{validate, Validator};

/// Default `Cache-Control` max-age applied to rendered badges.
pub const DEFAULT_CACHE_LENGTH_SECONDS: u64 = 120;

/// Unvalidated configuration as read from files, environment, or tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConfig {
    pub public: Value,
    pub private: Value,
}

impl RawConfig {
    pub fn new(public: Value, private: Value) -> Self {
        Self { public, private }
    }

    /// Deep-merge `overrides` into the public tree.
    pub fn with_public_overrides(mut self, overrides: Value) -> Self {
        merge_values(&mut self.public, overrides);
        self
    }

    /// Deep-merge `overrides` into the private tree.
    pub fn with_private_overrides(mut self, overrides: Value) -> Self {
        merge_values(&mut self.private, overrides);
        self
    }

    /// Validate with the built-in rule set.
    pub fn validate(&self) -> Result<ValidatedConfig, crate::ConfigError> {
        validate(&self.public, &self.private)
    }
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            public: Value::Object(Map::new()),
            private: Value::Object(Map::new()),
        }
    }
}

/// Configuration that passed validation. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub public: PublicConfig,
    pub private: PrivateConfig,
}

impl ValidatedConfig {
    /// Origin that `/` redirects to, if configured.
    pub fn redirect_url(&self) -> Option<&str> {
        self.public.redirect_url.as_deref()
    }

    /// Origin of the legacy raster renderer, if configured.
    pub fn raster_url(&self) -> Option<&str> {
        self.public.raster_url.as_deref()
    }

    pub fn default_cache_seconds(&self) -> u64 {
        self.public.cache_headers.default_cache_length_seconds
    }
}

/// Non-secret settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicConfig {
    pub bind: BindConfig,

    /// Frontend origin the service root redirects to.
    #[serde(default)]
    pub redirect_url: Option<String>,

    /// Origin of the separately hosted raster renderer.
    #[serde(default)]
    pub raster_url: Option<String>,

    #[serde(default)]
    pub cors: CorsConfig,

    #[serde(default)]
    pub cache_headers: CacheHeadersConfig,

    #[serde(default)]
    pub metrics: MetricsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindConfig {
    pub port: u16,
    pub address: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsConfig {
    #[serde(default)]
    pub allowed_origin: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheHeadersConfig {
    #[serde(default = "default_cache_length")]
    pub default_cache_length_seconds: u64,
}

impl Default for CacheHeadersConfig {
    fn default() -> Self {
        Self {
            default_cache_length_seconds: DEFAULT_CACHE_LENGTH_SECONDS,
        }
    }
}

fn default_cache_length() -> u64 {
    DEFAULT_CACHE_LENGTH_SECONDS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSection {
    #[serde(default)]
    pub prometheus: PrometheusConfig,
    #[serde(default)]
    pub influx: InfluxConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Expose `/metrics`. Ignored unless `enabled` is set.
    #[serde(default)]
    pub endpoint_enabled: bool,
}

/// Influx push exporter settings. The exporter itself lives outside this
/// workspace; only its configuration is checked here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluxConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub timeout_milliseconds: Option<u64>,
    #[serde(default)]
    pub interval_seconds: Option<u64>,
    #[serde(default)]
    pub instance_id_from: InstanceIdFrom,
    #[serde(default)]
    pub instance_id_env_var_name: Option<String>,
    #[serde(default)]
    pub env_label: Option<String>,
}

/// Where the instance id comes from when none is passed explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceIdFrom {
    #[default]
    Random,
    EnvVar,
}

/// Secret settings. Unknown keys are rejected so that a misspelt credential
/// fails loudly instead of being ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrivateConfig {
    #[serde(default)]
    pub metrics: PrivateMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PrivateMetrics {
    #[serde(default)]
    pub influx: Option<InfluxCredentials>,
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct InfluxCredentials {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl std::fmt::Debug for InfluxCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Deep-merge `overrides` into `base`. Objects merge key by key; any other
/// value replaces what was there.
pub fn merge_values(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            for (key, value) in override_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

/// Look up a dotted path. `null` counts as absent.
pub fn lookup<'a>(root: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(root, |node, segment| node.get(segment))
        .filter(|v| !v.is_null())
}

/// Set a dotted path, creating intermediate objects as needed. Non-object
/// values along the path are replaced.
pub fn set_path(root: &mut Value, dotted: &str, value: Value) {
    if !root.is_object() {
        *root = Value::Object(Map::new());
    }
    let Value::Object(map) = root else {
        return;
    };

    match dotted.split_once('.') {
        None => {
            map.insert(dotted.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map.entry(head.to_string()).or_insert(Value::Null);
            set_path(child, rest, value);
        }
    }
}
