//! Request correlation and HTTP metrics.
//!
//! [`MetricsLayer`] wraps the whole router. For every request it opens a
//! `request` span carrying the correlation id, echoes that id back in the
//! `x-request-id` response header, and records:
//!
//! - `badgeserve_http_requests_total{method, route, format, status}`
//! - `badgeserve_http_request_duration_seconds{route, format}`
//! - `badgeserve_http_response_size_bytes{route, format}` (when the body size is known)
//!
//! Badge paths are labelled `/<category>/*` only when a renderer is
//! registered for that category; every other path is labelled `/*`. The
//! label set is therefore bounded by the registry, whatever clients request.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response};
use badgeserve_lib::{Extension, ServiceRegistry};
use http_body::Body;
use pin_project_lite::pin_project;
use tower::{Layer, Service};
use tracing::{info_span, Span};
use uuid::Uuid;

/// Header carrying the correlation id, inbound and outbound.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest inbound correlation id that is trusted; longer ones are replaced.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Correlation id of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Fresh time-ordered id (UUID v7).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.0).ok()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reuse the caller's `X-Request-ID` when it is printable and reasonably
/// short, otherwise generate one.
pub fn extract_or_generate_request_id(headers: &HeaderMap) -> RequestId {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= MAX_REQUEST_ID_LEN)
        .map(|s| RequestId(s.to_string()))
        .unwrap_or_else(RequestId::generate)
}

/// `route` label for a request path.
///
/// Operational endpoints keep their path. Badge paths collapse to their
/// leading segment when it is one of `categories`, and to `/*` otherwise.
pub fn route_label(path: &str, categories: &HashSet<String>) -> String {
    match path {
        "/" | "/metrics" | "/health/live" | "/health/ready" => path.to_string(),
        _ => match path.trim_start_matches('/').split_once('/') {
            Some((category, _)) if categories.contains(category) => format!("/{category}/*"),
            _ => "/*".to_string(),
        },
    }
}

/// `format` label: the recognized extension of the last path segment, or
/// `"none"`.
pub fn format_label(path: &str) -> &'static str {
    path.rsplit('/')
        .next()
        .and_then(Extension::split_segment)
        .map_or("none", |(_, ext)| ext.as_str())
}

#[derive(Debug, Clone, Default)]
pub struct MetricsLayer {
    categories: Arc<HashSet<String>>,
}

impl MetricsLayer {
    /// Layer that gives each of `categories` its own `route` label.
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: Arc::new(categories.into_iter().map(Into::into).collect()),
        }
    }

    pub fn for_registry(registry: &ServiceRegistry) -> Self {
        Self::new(registry.categories())
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsMiddleware {
            inner,
            categories: Arc::clone(&self.categories),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricsMiddleware<S> {
    inner: S,
    categories: Arc<HashSet<String>>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsMiddleware<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Body + Send + 'static,
    ResBody: Body + Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = MetricsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let labels = RequestLabels {
            method: req.method().to_string(),
            route: route_label(req.uri().path(), &self.categories),
            format: format_label(req.uri().path()),
        };
        let request_id = extract_or_generate_request_id(req.headers());

        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %labels.method,
            path = %req.uri().path(),
        );

        MetricsFuture {
            inner: span.in_scope(|| self.inner.call(req)),
            start: Instant::now(),
            labels,
            request_id,
            span,
        }
    }
}

#[derive(Debug)]
struct RequestLabels {
    method: String,
    route: String,
    format: &'static str,
}

impl RequestLabels {
    fn record<B: Body>(&self, response: Option<&Response<B>>, elapsed_secs: f64) {
        let status = response.map_or_else(
            || "error".to_string(),
            |r| r.status().as_u16().to_string(),
        );

        metrics::counter!(
            "badgeserve_http_requests_total",
            "method" => self.method.clone(),
            "route" => self.route.clone(),
            "format" => self.format,
            "status" => status
        )
        .increment(1);

        metrics::histogram!(
            "badgeserve_http_request_duration_seconds",
            "route" => self.route.clone(),
            "format" => self.format
        )
        .record(elapsed_secs);

        if let Some(size) = response.and_then(|r| r.body().size_hint().exact()) {
            metrics::histogram!(
                "badgeserve_http_response_size_bytes",
                "route" => self.route.clone(),
                "format" => self.format
            )
            .record(size as f64);
        }
    }
}

pin_project! {
    /// Completes the wrapped response future, then tags and records it.
    pub struct MetricsFuture<F> {
        #[pin]
        inner: F,
        start: Instant,
        labels: RequestLabels,
        request_id: RequestId,
        span: Span,
    }
}

impl<F, ResBody, E> Future for MetricsFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
    ResBody: Body,
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let _enter = this.span.enter();

        let mut result = match this.inner.poll(cx) {
            Poll::Pending => return Poll::Pending,
            Poll::Ready(result) => result,
        };

        let elapsed = this.start.elapsed();
        match &mut result {
            Ok(response) => {
                if let Some(value) = this.request_id.header_value() {
                    response.headers_mut().insert(REQUEST_ID_HEADER, value);
                }
                this.labels.record(Some(&*response), elapsed.as_secs_f64());
                tracing::info!(
                    status = response.status().as_u16(),
                    route = %this.labels.route,
                    latency_ms = elapsed.as_millis() as u64,
                    "request completed"
                );
            }
            Err(_) => {
                this.labels.record::<ResBody>(None, elapsed.as_secs_f64());
                tracing::error!(latency_ms = elapsed.as_millis() as u64, "request failed");
            }
        }

        Poll::Ready(result)
    }
}
