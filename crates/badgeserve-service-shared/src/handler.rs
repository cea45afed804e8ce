//! The badge handler: every path not claimed by an operational route.

use axum::extract::{Query, State};
use axum::http::{StatusCode, Uri};
use badgeserve_lib::{
    not_found_badge, obsolete_format_badge, Badge, Extension, QueryParams, RouteDecision,
};
use tracing::{debug, warn};

use crate::metrics::{record_badge_rendered, record_fallback, record_redirect};
use crate::response::BadgeResponse;
use crate::AppState;

/// `category` value reported for renderers without a category segment.
const ROOT_CATEGORY: &str = "_root";

/// Classify the request and answer with a badge or a redirect.
///
/// Never fails: renderer errors and panics become the not-found stand-in.
pub async fn badge_handler(State(state): State<AppState>, uri: Uri) -> BadgeResponse {
    let query = query_params(&uri);
    let dispatcher = state.dispatcher();
    let default_max_age = state.config().default_cache_seconds();

    let decision = dispatcher.dispatch(uri.path(), uri.query(), &query);
    let status = decision.status();
    debug!(decision = decision.kind(), "request classified");

    match decision {
        RouteDecision::Render(route) => match dispatcher.render(&route).await {
            Ok(badge) => {
                record_badge_rendered(
                    route.category.as_deref().unwrap_or(ROOT_CATEGORY),
                    route.extension.as_str(),
                );
                let max_age = badge.cache_seconds.unwrap_or(default_max_age);
                BadgeResponse::badge(status, badge.render(route.extension), max_age)
            }
            Err(err) => {
                warn!(
                    category = route.category.as_deref().unwrap_or(ROOT_CATEGORY),
                    error = %err,
                    "badge renderer failed"
                );
                record_fallback("render_failed");
                stand_in(
                    StatusCode::NOT_FOUND,
                    not_found_badge(),
                    route.extension,
                    default_max_age,
                )
            }
        },
        RouteDecision::RedirectRoot { target } => {
            record_redirect("root");
            BadgeResponse::redirect(status, target)
        }
        RouteDecision::RedirectLegacyRaster { target } => {
            record_redirect("legacy_raster");
            BadgeResponse::redirect(status, target)
        }
        RouteDecision::ObsoleteFormat => {
            record_fallback("obsolete_format");
            stand_in(status, obsolete_format_badge(), Extension::Svg, default_max_age)
        }
        RouteDecision::NotFound { format } => {
            record_fallback("not_found");
            stand_in(status, not_found_badge(), format, default_max_age)
        }
    }
}

fn stand_in(status: StatusCode, badge: Badge, format: Extension, max_age: u64) -> BadgeResponse {
    BadgeResponse::badge(status, badge.render(format), max_age)
}

/// URL query pairs in submission order. A malformed query string is treated
/// as empty.
fn query_params(uri: &Uri) -> QueryParams {
    match Query::<Vec<(String, String)>>::try_from_uri(uri) {
        Ok(Query(pairs)) => QueryParams::from_pairs(pairs),
        Err(err) => {
            debug!(error = %err, "ignoring malformed query string");
            QueryParams::new()
        }
    }
}
