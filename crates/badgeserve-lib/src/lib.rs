//! badgeserve library entry points.
//!
//! This crate holds the request classification core of the badge service:
//! configuration loading and validation, instance metadata, the format
//! partition and legacy raster redirector, the route dispatcher, the badge
//! model with its SVG/JSON primitive, and the renderer registry. It performs
//! no network I/O and knows nothing about the HTTP server; the service crates
//! only depend on what is exported here.
//!

#![deny(warnings)]

pub mod badge;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fallback;
pub mod format;
pub mod instance;
pub mod legacy;
pub mod request;
pub mod services;

pub use badge::{Badge, RenderedBadge};
pub use config::{
    validate, ConfigLoader, PrivateConfig, PublicConfig, RawConfig, SubsystemRule, Tier, Trigger,
    ValidatedConfig, Validator,
};
pub use dispatch::{Dispatcher, RenderRoute, RouteDecision};
pub use error::{ConfigError, ConfigLoadError, Error, RenderError, Result};
pub use fallback::{not_found_badge, obsolete_format_badge};
pub use format::{Extension, FormatClass};
pub use instance::InstanceMetadata;
pub use legacy::resolve_legacy_redirect;
pub use request::{BadgeRequest, QueryParams, QueryValue, RenderParams};
pub use services::{
    BadgeService, QueryStaticBadgeService, RenderFuture, RootStaticBadgeService, ServiceRegistry,
    StaticBadgeService,
};
