//! Configuration validation.
//!
//! Validation runs in a fixed order and stops at the first failing stage:
//!
//! 1. structure: each tree deserializes into its typed form,
//! 2. subsystem rules: public requirements, then private requirements,
//! 3. values: URIs parse as absolute `http`/`https` origins.
//!
//! Nothing here touches global state or performs I/O, so it is safe to call
//! repeatedly with different candidates.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::rules::{builtin_rules, SubsystemRule};
use super::{PrivateConfig, PublicConfig, ValidatedConfig};
use crate::error::{ConfigError, Tier};

/// Validate with the built-in rule set.
pub fn validate(public: &Value, private: &Value) -> Result<ValidatedConfig, ConfigError> {
    Validator::default().validate(public, private)
}

/// Validator holding the subsystem rules to enforce.
#[derive(Debug, Clone)]
pub struct Validator {
    rules: Vec<SubsystemRule>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(builtin_rules())
    }
}

impl Validator {
    pub fn new(rules: Vec<SubsystemRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[SubsystemRule] {
        &self.rules
    }

    pub fn validate(&self, public: &Value, private: &Value) -> Result<ValidatedConfig, ConfigError> {
        let public_typed: PublicConfig = parse_tree(public, Tier::Public)?;
        let private_typed: PrivateConfig = parse_tree(private, Tier::Private)?;

        let active: Vec<&SubsystemRule> = self
            .rules
            .iter()
            .filter(|rule| rule.trigger.is_active(public))
            .collect();

        let missing_public = dedup(active.iter().flat_map(|rule| rule.missing_public(public)));
        if !missing_public.is_empty() {
            return Err(ConfigError::MissingPublic {
                paths: missing_public,
            });
        }

        let missing_private = dedup(active.iter().flat_map(|rule| rule.missing_private(private)));
        if !missing_private.is_empty() {
            return Err(ConfigError::MissingPrivate {
                paths: missing_private,
            });
        }

        check_values(&public_typed)?;

        tracing::debug!(
            active_rules = active.len(),
            "configuration validated"
        );

        Ok(ValidatedConfig {
            public: public_typed,
            private: private_typed,
        })
    }
}

fn parse_tree<T: DeserializeOwned>(tree: &Value, tier: Tier) -> Result<T, ConfigError> {
    let tree = match tree {
        // An absent private tree is the common case for deployments without secrets.
        Value::Null if tier == Tier::Private => Value::Object(Map::new()),
        Value::Object(_) => tree.clone(),
        other => {
            return Err(ConfigError::Structure {
                tier,
                message: format!("expected an object, found {}", kind_of(other)),
            })
        }
    };

    serde_json::from_value(tree).map_err(|e| ConfigError::Structure {
        tier,
        message: e.to_string(),
    })
}

fn check_values(public: &PublicConfig) -> Result<(), ConfigError> {
    let candidates = [
        ("redirectUrl", public.redirect_url.as_deref()),
        ("rasterUrl", public.raster_url.as_deref()),
        ("metrics.influx.uri", public.metrics.influx.uri.as_deref()),
    ];

    for (path, value) in candidates {
        if let Some(value) = value {
            check_origin(path, value)?;
        }
    }

    if let Some(name) = public.metrics.influx.instance_id_env_var_name.as_deref() {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                path: "metrics.influx.instanceIdEnvVarName".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
    }

    Ok(())
}

fn check_origin(path: &str, value: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let uri: http::Uri = value
        .parse()
        .map_err(|_| invalid("must be a valid uri"))?;

    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(invalid("must use the http or https scheme")),
    }

    if uri.authority().is_none() {
        return Err(invalid("must include a host"));
    }

    Ok(())
}

fn dedup(paths: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = Vec::new();
    for path in paths {
        if !seen.contains(&path) {
            seen.push(path);
        }
    }
    seen
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
