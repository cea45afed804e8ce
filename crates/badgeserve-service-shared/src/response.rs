//! HTTP response for badge requests.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use badgeserve_lib::{not_found_badge, Extension, RenderedBadge};

/// A rendered badge or a redirect, ready to be written to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeResponse {
    Badge {
        status: StatusCode,
        rendered: RenderedBadge,
        max_age: u64,
    },
    Redirect {
        status: StatusCode,
        location: String,
    },
}

impl BadgeResponse {
    pub fn badge(status: StatusCode, rendered: RenderedBadge, max_age: u64) -> Self {
        Self::Badge {
            status,
            rendered,
            max_age,
        }
    }

    pub fn redirect(status: StatusCode, location: impl Into<String>) -> Self {
        Self::Redirect {
            status,
            location: location.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Badge { status, .. } | Self::Redirect { status, .. } => *status,
        }
    }
}

impl IntoResponse for BadgeResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Badge {
                status,
                rendered,
                max_age,
            } => (
                status,
                [
                    (header::CONTENT_TYPE, rendered.content_type.to_string()),
                    (header::CACHE_CONTROL, format!("max-age={max_age}")),
                ],
                rendered.body,
            )
                .into_response(),
            Self::Redirect { status, location } => match HeaderValue::from_str(&location) {
                Ok(location) => (status, [(header::LOCATION, location)]).into_response(),
                Err(_) => {
                    tracing::warn!(location = %location, "redirect target is not a valid header value");
                    let rendered = not_found_badge().render(Extension::Svg);
                    (
                        StatusCode::NOT_FOUND,
                        [(header::CONTENT_TYPE, rendered.content_type)],
                        rendered.body,
                    )
                        .into_response()
                }
            },
        }
    }
}
