//! Request classification.
//!
//! [`Dispatcher::dispatch`] maps every path and query to exactly one
//! [`RouteDecision`]. It is synchronous and performs no I/O; only
//! [`Dispatcher::render`] suspends, on the renderer it resolves.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use http::StatusCode;

use crate::badge::Badge;
use crate::config::ValidatedConfig;
use crate::error::RenderError;
use crate::format::{Extension, FormatClass};
use crate::legacy::resolve_legacy_redirect;
use crate::request::{BadgeRequest, QueryParams, RenderParams};
use crate::services::ServiceRegistry;

/// Outcome of classifying one request.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteDecision {
    /// A renderer accepted the request.
    Render(RenderRoute),
    /// PNG/GIF: permanent redirect to the raster host.
    RedirectLegacyRaster { target: String },
    /// The bare root: temporary redirect to the configured landing page.
    RedirectRoot { target: String },
    /// JPG: the "410" stand-in, served with status 200.
    ObsoleteFormat,
    /// No renderer, or no recognized extension. `format` is the format the
    /// stand-in is rendered in.
    NotFound { format: Extension },
}

impl RouteDecision {
    /// HTTP status answered for this decision.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Render(_) | Self::ObsoleteFormat => StatusCode::OK,
            Self::RedirectLegacyRaster { .. } => StatusCode::MOVED_PERMANENTLY,
            Self::RedirectRoot { .. } => StatusCode::FOUND,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    /// Short name used for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Render(_) => "render",
            Self::RedirectLegacyRaster { .. } => "legacy_raster",
            Self::RedirectRoot { .. } => "root",
            Self::ObsoleteFormat => "obsolete_format",
            Self::NotFound { .. } => "not_found",
        }
    }
}

/// A request a renderer has accepted, with its query already coerced to text.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRoute {
    /// `None` for single-segment paths such as `/:label-message-color.svg`.
    pub category: Option<String>,
    pub subject_path: Vec<String>,
    pub extension: Extension,
    pub params: RenderParams,
}

/// Classifies requests against one configuration and one registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: Arc<ValidatedConfig>,
    registry: Arc<ServiceRegistry>,
}

impl Dispatcher {
    pub fn new(config: Arc<ValidatedConfig>, registry: Arc<ServiceRegistry>) -> Self {
        Self { config, registry }
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Classify a request. First match wins:
    ///
    /// 1. `/` with a redirect target configured
    /// 2. no recognized extension
    /// 3. obsolete format
    /// 4. legacy raster format
    /// 5. modern format, resolved through the registry
    pub fn dispatch(
        &self,
        raw_path: &str,
        raw_query: Option<&str>,
        query: &QueryParams,
    ) -> RouteDecision {
        if raw_path == "/" {
            if let Some(target) = self.config.redirect_url() {
                return RouteDecision::RedirectRoot {
                    target: target.to_string(),
                };
            }
        }

        let Some(request) = BadgeRequest::from_path(raw_path, query.clone()) else {
            return RouteDecision::NotFound {
                format: Extension::Svg,
            };
        };

        match request.extension.class() {
            FormatClass::Obsolete => RouteDecision::ObsoleteFormat,
            FormatClass::LegacyRaster => {
                match resolve_legacy_redirect(raw_path, raw_query, &self.config) {
                    Some(target) => RouteDecision::RedirectLegacyRaster { target },
                    None => RouteDecision::NotFound {
                        format: Extension::Svg,
                    },
                }
            }
            FormatClass::Modern => self.dispatch_modern(request),
        }
    }

    fn dispatch_modern(&self, request: BadgeRequest) -> RouteDecision {
        let params = request.query.sanitize();
        let not_found = RouteDecision::NotFound {
            format: request.extension,
        };

        if self
            .registry
            .resolve(request.category.as_deref(), &request.subject_path)
            .is_none()
        {
            return not_found;
        }

        RouteDecision::Render(RenderRoute {
            category: request.category,
            subject_path: request.subject_path,
            extension: request.extension,
            params,
        })
    }

    /// Run the renderer for an accepted route.
    ///
    /// A renderer that panics is reported as [`RenderError::Failed`]. Common
    /// query overrides are applied to the result and the cache lifetime is
    /// never shorter than the configured default.
    pub async fn render(&self, route: &RenderRoute) -> Result<Badge, RenderError> {
        let service = self
            .registry
            .resolve(route.category.as_deref(), &route.subject_path)
            .ok_or_else(|| RenderError::NotFound {
                subject: route.subject_path.join("/"),
            })?;

        let badge = AssertUnwindSafe(service.render(&route.subject_path, &route.params))
            .catch_unwind()
            .await
            .map_err(|panic| RenderError::Failed {
                message: panic_message(panic.as_ref()),
            })??;

        let mut badge = badge.apply_overrides(&route.params);
        let floor = self.config.default_cache_seconds();
        badge.cache_seconds = Some(badge.cache_seconds.map_or(floor, |s| s.max(floor)));
        Ok(badge)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("renderer panicked: {message}")
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("renderer panicked: {message}")
    } else {
        "renderer panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validate;
    use crate::services::{BadgeService, RenderFuture};
    use serde_json::json;

    struct Exploding;

    impl BadgeService for Exploding {
        fn category(&self) -> Option<&str> {
            Some("boom")
        }

        fn accepts(&self, _: &[String]) -> bool {
            true
        }

        fn render<'a>(&'a self, _: &'a [String], _: &'a RenderParams) -> RenderFuture<'a> {
            async { explode() }.boxed()
        }
    }

    fn explode() -> Result<Badge, RenderError> {
        panic!("kaboom")
    }

    fn dispatcher() -> Dispatcher {
        let public = json!({
            "bind": {"port": 0, "address": "::"},
            "redirectUrl": "https://example.com/",
            "rasterUrl": "https://raster.example.com",
        });
        let config = validate(&public, &json!({})).unwrap();
        let mut registry = ServiceRegistry::builtin();
        registry.register(Exploding);
        Dispatcher::new(Arc::new(config), Arc::new(registry))
    }

    fn classify(path: &str) -> RouteDecision {
        dispatcher().dispatch(path, None, &QueryParams::new())
    }

    #[test]
    fn root_redirects() {
        assert_eq!(
            classify("/"),
            RouteDecision::RedirectRoot {
                target: "https://example.com/".to_string()
            }
        );
        assert_eq!(classify("/").status(), StatusCode::FOUND);
    }

    #[test]
    fn root_without_redirect_is_not_found() {
        let config = validate(&json!({"bind": {"port": 0, "address": "::"}}), &json!({})).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(config), Arc::new(ServiceRegistry::builtin()));
        assert_eq!(
            dispatcher.dispatch("/", None, &QueryParams::new()),
            RouteDecision::NotFound {
                format: Extension::Svg
            }
        );
    }

    #[test]
    fn unknown_extension_is_not_found() {
        assert_eq!(
            classify("/badge/foo-bar-red.js"),
            RouteDecision::NotFound {
                format: Extension::Svg
            }
        );
        assert_eq!(
            classify("/badge/foo-bar-red"),
            RouteDecision::NotFound {
                format: Extension::Svg
            }
        );
    }

    #[test]
    fn jpg_is_obsolete_even_when_unresolvable() {
        assert_eq!(classify("/nope/nothing.jpg"), RouteDecision::ObsoleteFormat);
        assert_eq!(classify("/nope/nothing.jpg").status(), StatusCode::OK);
    }

    #[test]
    fn raster_redirects_even_when_unresolvable() {
        let decision = dispatcher().dispatch("/nope/Nothing.png", Some("a=B"), &QueryParams::new());
        assert_eq!(
            decision,
            RouteDecision::RedirectLegacyRaster {
                target: "https://raster.example.com/nope/Nothing.png?a=B".to_string()
            }
        );
        assert_eq!(decision.status(), StatusCode::MOVED_PERMANENTLY);
    }

    #[test]
    fn unresolvable_modern_is_not_found_in_requested_format() {
        assert_eq!(
            classify("/this/is/not/a/badge.json"),
            RouteDecision::NotFound {
                format: Extension::Json
            }
        );
    }

    #[test]
    fn resolvable_modern_renders_with_case_preserved() {
        match classify("/badge/:fRuiT-apple-green.svg") {
            RouteDecision::Render(route) => {
                assert_eq!(route.category.as_deref(), Some("badge"));
                assert_eq!(route.subject_path, vec![":fRuiT-apple-green"]);
                assert_eq!(route.extension, Extension::Svg);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[test]
    fn categoryless_colon_path_renders() {
        match classify("/:fRuiT-apple-green.svg") {
            RouteDecision::Render(route) => {
                assert_eq!(route.category, None);
                assert_eq!(route.subject_path, vec![":fRuiT-apple-green"]);
            }
            other => panic!("unexpected decision: {other:?}"),
        }
        assert_eq!(
            classify("/fRuiT-apple-green.svg"),
            RouteDecision::NotFound {
                format: Extension::Svg
            }
        );
    }

    #[test]
    fn query_values_are_coerced_to_text() {
        let mut query = QueryParams::new();
        query.push("logo", 1_i64);
        query.push("link", true);
        match dispatcher().dispatch("/badge/a-b-red.svg", None, &query) {
            RouteDecision::Render(route) => {
                assert_eq!(route.params.get("logo"), Some("1"));
                assert_eq!(route.params.get("link"), Some("true"));
            }
            other => panic!("unexpected decision: {other:?}"),
        }
    }

    #[tokio::test]
    async fn render_applies_overrides_and_cache_floor() {
        let dispatcher = dispatcher();
        let query = QueryParams::from_pairs([("cacheSeconds", "5"), ("label", "Fruit")]);
        let RouteDecision::Render(route) = dispatcher.dispatch("/badge/a-b-red.svg", None, &query)
        else {
            panic!("expected render");
        };
        let badge = dispatcher.render(&route).await.unwrap();
        assert_eq!(badge.label.as_deref(), Some("Fruit"));
        assert_eq!(badge.cache_seconds, Some(120));
    }

    #[tokio::test]
    async fn longer_cache_request_is_kept() {
        let dispatcher = dispatcher();
        let query = QueryParams::from_pairs([("cacheSeconds", "3600")]);
        let RouteDecision::Render(route) = dispatcher.dispatch("/badge/a-b-red.svg", None, &query)
        else {
            panic!("expected render");
        };
        let badge = dispatcher.render(&route).await.unwrap();
        assert_eq!(badge.cache_seconds, Some(3600));
    }

    #[tokio::test]
    async fn panicking_renderer_becomes_failed() {
        let dispatcher = dispatcher();
        let RouteDecision::Render(route) = dispatcher.dispatch("/boom/x.svg", None, &QueryParams::new())
        else {
            panic!("expected render");
        };
        let err = dispatcher.render(&route).await.unwrap_err();
        assert!(matches!(err, RenderError::Failed { ref message } if message.contains("kaboom")));
    }

    #[test]
    fn dispatch_is_repeatable() {
        let dispatcher = dispatcher();
        let query = QueryParams::from_pairs([("color", "blue")]);
        let first = dispatcher.dispatch("/badge/a-b-red.svg", None, &query);
        let second = dispatcher.dispatch("/badge/a-b-red.svg", None, &query);
        assert_eq!(first, second);
    }
}
