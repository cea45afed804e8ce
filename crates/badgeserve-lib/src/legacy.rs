//! Redirects for raster formats rendered by a separate host.

use crate::config::ValidatedConfig;
use crate::format::{Extension, FormatClass};

/// Redirect target for a legacy raster request, or `None` when the path is
/// not a raster request or no raster host is configured.
///
/// The target is the configured raster origin followed by the original path
/// and query, byte for byte.
pub fn resolve_legacy_redirect(
    raw_path: &str,
    raw_query: Option<&str>,
    config: &ValidatedConfig,
) -> Option<String> {
    let last = raw_path.rsplit('/').next()?;
    let (_, extension) = Extension::split_segment(last)?;
    if extension.class() != FormatClass::LegacyRaster {
        return None;
    }

    let origin = config.raster_url()?.trim_end_matches('/');
    Some(raster_target(origin, raw_path, raw_query))
}

fn raster_target(origin: &str, raw_path: &str, raw_query: Option<&str>) -> String {
    let mut target = String::with_capacity(origin.len() + raw_path.len() + 1);
    target.push_str(origin);
    if !raw_path.starts_with('/') {
        target.push('/');
    }
    target.push_str(raw_path);
    if let Some(query) = raw_query.filter(|q| !q.is_empty()) {
        target.push('?');
        target.push_str(query);
    }
    target
}
