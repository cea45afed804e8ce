//! HTTP layer for the badge service.
//!
//! - [`Server`]: validates configuration, resolves the instance id, and
//!   builds the axum router
//! - [`AppState`]: dispatcher and instance metadata shared by handlers
//! - [`badge_handler`]: answers every badge path with a badge or a redirect
//! - [`health`]: liveness and readiness checks
//! - [`metrics`]: Prometheus recorder and business counters
//! - [`logging`]: structured logging setup
//! - [`middleware`]: request ids and HTTP metrics
//!
//! # Architecture
//!
//! Routing decisions live in `badgeserve-lib`. This crate provides only HTTP
//! glue:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  MetricsLayer (request id span, HTTP metrics)               │
//! │  badge_handler                                              │
//! │  - Dispatcher::dispatch (pure classification)               │
//! │  - Dispatcher::render   (renderer, panics caught)           │
//! │  - BadgeResponse        (status, headers, body)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Testing Support
//!
//! The [`test_utils`] module provides fixture configurations and servers.
//! Enable the `test-utils` feature to access it from dependent crates.

#![deny(warnings)]

mod handler;
pub mod health;
pub mod logging;
pub mod metrics;
pub mod middleware;
mod response;
mod server;
mod state;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use handler::badge_handler;
pub use health::{health_live, health_ready, HealthStatus};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{
    init_metrics, metrics_handler, record_badge_rendered, record_fallback, record_redirect,
    MetricsConfig, MetricsError,
};
pub use middleware::{extract_or_generate_request_id, MetricsLayer, RequestId};
pub use response::BadgeResponse;
pub use server::Server;
pub use state::AppState;
