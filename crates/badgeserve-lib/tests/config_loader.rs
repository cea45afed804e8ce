//! Layered loading of configuration files and environment overrides.

use std::collections::HashMap;
use std::fs;

use badgeserve_lib::{ConfigLoadError, ConfigLoader};
use serde_json::json;
use tempfile::TempDir;

const DEFAULT_YML: &str = r#"
public:
  bind:
    port: 8080
    address: "0.0.0.0"
  rasterUrl: "https://raster.example.com"
  cacheHeaders:
    defaultCacheLengthSeconds: 300
  metrics:
    prometheus:
      enabled: false
      endpointEnabled: false
    influx:
      enabled: false
"#;

fn config_dir(local: Option<&str>) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("default.yml"), DEFAULT_YML).unwrap();
    if let Some(local) = local {
        fs::write(dir.path().join("local.yml"), local).unwrap();
    }
    dir
}

fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn defaults_load_and_validate() {
    let dir = config_dir(None);
    let raw = ConfigLoader::new(dir.path())
        .with_env(HashMap::new())
        .load()
        .unwrap();

    let config = raw.validate().unwrap();
    assert_eq!(config.public.bind.port, 8080);
    assert_eq!(config.default_cache_seconds(), 300);
    assert_eq!(config.raster_url(), Some("https://raster.example.com"));
}

#[test]
fn local_file_overrides_defaults_deeply() {
    let dir = config_dir(Some(
        r#"
public:
  metrics:
    prometheus:
      enabled: true
private:
  metrics:
    influx:
      username: "writer"
"#,
    ));
    let raw = ConfigLoader::new(dir.path())
        .with_env(HashMap::new())
        .load()
        .unwrap();

    assert_eq!(raw.public["metrics"]["prometheus"]["enabled"], json!(true));
    assert_eq!(raw.public["metrics"]["prometheus"]["endpointEnabled"], json!(false));
    assert_eq!(raw.public["bind"]["port"], json!(8080));
    assert_eq!(raw.private["metrics"]["influx"]["username"], json!("writer"));
}

#[test]
fn environment_wins_over_files() {
    let dir = config_dir(Some("public:\n  bind:\n    port: 9000\n"));
    let raw = ConfigLoader::new(dir.path())
        .with_env(env(&[
            ("PORT", "9100"),
            ("METRICS_INFLUX_ENABLED", "yes"),
            ("INFLUX_PASSWORD", "s3cret"),
        ]))
        .load()
        .unwrap();

    assert_eq!(raw.public["bind"]["port"], json!(9100));
    assert_eq!(raw.public["metrics"]["influx"]["enabled"], json!(true));
    assert_eq!(raw.private["metrics"]["influx"]["password"], json!("s3cret"));
}

#[test]
fn enabling_influx_from_env_without_settings_fails_validation() {
    let dir = config_dir(None);
    let raw = ConfigLoader::new(dir.path())
        .with_env(env(&[("METRICS_INFLUX_ENABLED", "true")]))
        .load()
        .unwrap();

    let err = raw.validate().unwrap_err();
    assert!(err.to_string().contains("\"metrics.influx.uri\" is required"));
}

#[test]
fn invalid_integer_override_is_rejected() {
    let dir = config_dir(None);
    let err = ConfigLoader::new(dir.path())
        .with_env(env(&[("PORT", "eighty")]))
        .load()
        .unwrap_err();

    assert!(matches!(err, ConfigLoadError::InvalidEnv { ref var, .. } if var == "PORT"));
}

#[test]
fn malformed_yaml_is_a_parse_error() {
    let dir = config_dir(Some("public: [unterminated"));
    let err = ConfigLoader::new(dir.path())
        .with_env(HashMap::new())
        .load()
        .unwrap_err();

    assert!(matches!(err, ConfigLoadError::Parse { .. }));
}
