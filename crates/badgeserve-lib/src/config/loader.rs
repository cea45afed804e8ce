//! Layered configuration loading.
//!
//! Sources are applied in order, later ones winning:
//!
//! 1. `default.yml` in the configuration directory (required),
//! 2. `local.yml` in the same directory (optional),
//! 3. environment variable overrides (`PORT`, `RASTER_URL`, `INFLUX_PASSWORD`, ...).
//!
//! Each file holds a `public:` and an optional `private:` section. The result
//! is a [`RawConfig`]; nothing is validated here.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::{merge_values, set_path, RawConfig};
use crate::error::{ConfigLoadError, Tier};

/// File holding the shipped defaults.
pub const DEFAULT_FILE: &str = "default.yml";

/// Optional per-deployment file layered over the defaults.
pub const LOCAL_FILE: &str = "local.yml";

#[derive(Debug, Clone, Copy)]
enum EnvKind {
    Text,
    Integer,
    Bool,
}

struct EnvOverride {
    var: &'static str,
    tier: Tier,
    path: &'static str,
    kind: EnvKind,
}

/// Environment variables understood by the loader.
const ENV_OVERRIDES: &[EnvOverride] = &[
    EnvOverride {
        var: "PORT",
        tier: Tier::Public,
        path: "bind.port",
        kind: EnvKind::Integer,
    },
    EnvOverride {
        var: "BIND_ADDRESS",
        tier: Tier::Public,
        path: "bind.address",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "REDIRECT_URL",
        tier: Tier::Public,
        path: "redirectUrl",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "RASTER_URL",
        tier: Tier::Public,
        path: "rasterUrl",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "METRICS_PROMETHEUS_ENABLED",
        tier: Tier::Public,
        path: "metrics.prometheus.enabled",
        kind: EnvKind::Bool,
    },
    EnvOverride {
        var: "METRICS_PROMETHEUS_ENDPOINT_ENABLED",
        tier: Tier::Public,
        path: "metrics.prometheus.endpointEnabled",
        kind: EnvKind::Bool,
    },
    EnvOverride {
        var: "METRICS_INFLUX_ENABLED",
        tier: Tier::Public,
        path: "metrics.influx.enabled",
        kind: EnvKind::Bool,
    },
    EnvOverride {
        var: "INFLUX_URL",
        tier: Tier::Public,
        path: "metrics.influx.uri",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "INFLUX_TIMEOUT_MILLISECONDS",
        tier: Tier::Public,
        path: "metrics.influx.timeoutMilliseconds",
        kind: EnvKind::Integer,
    },
    EnvOverride {
        var: "INFLUX_INTERVAL_SECONDS",
        tier: Tier::Public,
        path: "metrics.influx.intervalSeconds",
        kind: EnvKind::Integer,
    },
    EnvOverride {
        var: "INSTANCE_ID_FROM",
        tier: Tier::Public,
        path: "metrics.influx.instanceIdFrom",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "INSTANCE_ID_ENV_VAR_NAME",
        tier: Tier::Public,
        path: "metrics.influx.instanceIdEnvVarName",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "INFLUX_ENV_LABEL",
        tier: Tier::Public,
        path: "metrics.influx.envLabel",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "INFLUX_USERNAME",
        tier: Tier::Private,
        path: "metrics.influx.username",
        kind: EnvKind::Text,
    },
    EnvOverride {
        var: "INFLUX_PASSWORD",
        tier: Tier::Private,
        path: "metrics.influx.password",
        kind: EnvKind::Text,
    },
];

/// Reads configuration files and environment overrides into a [`RawConfig`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    dir: PathBuf,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Loader reading from `dir` and the process environment.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            env: None,
        }
    }

    /// Replace the process environment with a fixed map.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load(&self) -> Result<RawConfig, ConfigLoadError> {
        let default_path = self.dir.join(DEFAULT_FILE);
        if !default_path.exists() {
            return Err(ConfigLoadError::NotFound { path: default_path });
        }

        let mut raw = RawConfig::default();
        apply_file(&mut raw, &default_path)?;

        let local_path = self.dir.join(LOCAL_FILE);
        if local_path.exists() {
            tracing::debug!(path = %local_path.display(), "applying local configuration");
            apply_file(&mut raw, &local_path)?;
        }

        for entry in ENV_OVERRIDES {
            let Some(value) = self.env_var(entry.var) else {
                continue;
            };
            let parsed = parse_env(entry, &value)?;
            let tree = match entry.tier {
                Tier::Public => &mut raw.public,
                Tier::Private => &mut raw.private,
            };
            set_path(tree, entry.path, parsed);
            tracing::debug!(var = entry.var, path = entry.path, "applied environment override");
        }

        Ok(raw)
    }

    fn env_var(&self, name: &str) -> Option<String> {
        let value = match &self.env {
            Some(map) => map.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|v| !v.is_empty())
    }
}

fn apply_file(raw: &mut RawConfig, path: &Path) -> Result<(), ConfigLoadError> {
    let text = fs::read_to_string(path)?;
    if text.trim().is_empty() {
        return Ok(());
    }
    let doc: Value = serde_yaml::from_str(&text).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut sections = match doc {
        Value::Object(sections) => sections,
        Value::Null => return Ok(()),
        other => {
            return Err(ConfigLoadError::NotAMapping {
                path: path.to_path_buf(),
                found: yaml_kind(&other),
            })
        }
    };

    if let Some(public) = sections.remove("public") {
        merge_values(&mut raw.public, public);
    }
    if let Some(private) = sections.remove("private") {
        merge_values(&mut raw.private, private);
    }
    Ok(())
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "nothing",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}

fn parse_env(entry: &EnvOverride, value: &str) -> Result<Value, ConfigLoadError> {
    let invalid = |expected| ConfigLoadError::InvalidEnv {
        var: entry.var.to_string(),
        value: value.to_string(),
        expected,
    };

    match entry.kind {
        EnvKind::Text => Ok(Value::String(value.to_string())),
        EnvKind::Integer => value
            .trim()
            .parse::<u64>()
            .map(Value::from)
            .map_err(|_| invalid("an unsigned integer")),
        EnvKind::Bool => match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "no" => Ok(Value::Bool(false)),
            _ => Err(invalid("a boolean")),
        },
    }
}
