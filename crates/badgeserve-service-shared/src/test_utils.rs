//! Test fixtures for handler and router tests.

use serde_json::{json, Value};

use crate::server::Server;
use crate::state::AppState;

/// Instance id used by [`test_server`].
pub const TEST_INSTANCE_ID: &str = "test-instance";

/// Redirect target configured for `/`.
pub const TEST_REDIRECT_URL: &str = "https://badges.example.com/";

/// Raster origin configured for PNG/GIF.
pub const TEST_RASTER_URL: &str = "https://raster.example.com";

/// A public tree with every optional host configured and metrics off.
pub fn test_public_config() -> Value {
    json!({
        "bind": {"port": 0, "address": "127.0.0.1"},
        "redirectUrl": TEST_REDIRECT_URL,
        "rasterUrl": TEST_RASTER_URL,
        "cacheHeaders": {"defaultCacheLengthSeconds": 120},
    })
}

pub fn test_private_config() -> Value {
    json!({})
}

/// Public tree with the Influx exporter enabled and fully configured.
pub fn influx_public_config() -> Value {
    let mut public = test_public_config();
    public["metrics"] = json!({
        "influx": {
            "enabled": true,
            "uri": "https://influx.example.com/write",
            "timeoutMilliseconds": 1000,
            "intervalSeconds": 15,
        }
    });
    public
}

/// Private tree matching [`influx_public_config`].
pub fn influx_private_config() -> Value {
    json!({"metrics": {"influx": {"username": "writer", "password": "s3cret"}}})
}

/// A server built from [`test_public_config`] with a fixed instance id.
///
/// # Panics
///
/// Panics if the fixture configuration is rejected, which indicates a broken
/// fixture.
pub fn test_server() -> Server {
    Server::with_instance_id(&test_public_config(), &test_private_config(), TEST_INSTANCE_ID)
        .unwrap_or_else(|e| panic!("test configuration rejected: {e}"))
}

pub fn test_state() -> AppState {
    let server = test_server();
    AppState::new(server.dispatcher(), server.instance_metadata().clone())
}
