//! Inbound badge requests and query parameter coercion.
//!
//! Query values are untyped at ingress. A value may arrive as text, as a
//! boolean, or as a number, and renderers must never fail because of which one
//! it was. [`QueryParams::sanitize`] is the only way to obtain the
//! [`RenderParams`] renderers consume, so every value a renderer sees is
//! already text.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::format::Extension;

/// A raw query parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Bool(bool),
    Number(Number),
    Text(String),
}

impl QueryValue {
    /// Text form of the value. Never fails and never changes letter case.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            QueryValue::Text(s) => Cow::Borrowed(s),
            QueryValue::Bool(b) => Cow::Owned(b.to_string()),
            QueryValue::Number(n) => Cow::Owned(n.to_string()),
        }
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Number(value.into())
    }
}

impl From<u64> for QueryValue {
    fn from(value: u64) -> Self {
        QueryValue::Number(value.into())
    }
}

impl From<f64> for QueryValue {
    fn from(value: f64) -> Self {
        match Number::from_f64(value) {
            Some(n) => QueryValue::Number(n),
            None => QueryValue::Text(value.to_string()),
        }
    }
}

/// Query parameters in submission order. Keys may repeat.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, QueryValue)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<QueryValue>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value submitted for `key`.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Coerce every value to text for rendering.
    pub fn sanitize(&self) -> RenderParams {
        RenderParams {
            pairs: self
                .pairs
                .iter()
                .map(|(k, v)| (k.clone(), v.to_text().into_owned()))
                .collect(),
        }
    }
}

/// Query parameters after coercion; every value is text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderParams {
    pairs: Vec<(String, String)>,
}

impl RenderParams {
    /// First value submitted for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value submitted for `key`.
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|v| !v.is_empty())
    }

    /// Every value submitted for `key`, in order.
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A request for a badge, parsed from the request path.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeRequest {
    /// Leading namespace segment, absent for single-segment paths.
    pub category: Option<String>,
    /// Remaining segments, percent-decoded, extension stripped from the last.
    pub subject_path: Vec<String>,
    pub extension: Extension,
    pub query: QueryParams,
}

impl BadgeRequest {
    /// Parse a raw (still percent-encoded) request path.
    ///
    /// Returns `None` when the trailing segment carries no recognized
    /// extension. Segment case is preserved exactly.
    pub fn from_path(raw_path: &str, query: QueryParams) -> Option<Self> {
        let trimmed = raw_path.strip_prefix('/').unwrap_or(raw_path);
        let mut raw_segments: Vec<&str> = trimmed.split('/').collect();

        let last = raw_segments.pop()?;
        let (stem, extension) = Extension::split_segment(last)?;

        let mut segments: Vec<String> = raw_segments.into_iter().map(percent_decode).collect();
        segments.push(percent_decode(stem));

        let (category, subject_path) = if segments.len() > 1 {
            let category = segments.remove(0);
            (Some(category), segments)
        } else {
            (None, segments)
        };

        Some(Self {
            category,
            subject_path,
            extension,
            query,
        })
    }
}

/// Decode `%XX` escapes. Malformed escapes are kept literally and invalid
/// UTF-8 is replaced rather than rejected.
pub fn percent_decode(segment: &str) -> String {
    let bytes = urlencoding::decode_binary(segment.as_bytes());
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_values_coerce_to_text() {
        assert_eq!(QueryValue::from(true).to_text(), "true");
        assert_eq!(QueryValue::from(1_i64).to_text(), "1");
        assert_eq!(QueryValue::from(1.5_f64).to_text(), "1.5");
        assert_eq!(QueryValue::from(f64::NAN).to_text(), "NaN");
        assert_eq!(QueryValue::from("fRuiT").to_text(), "fRuiT");
    }

    #[test]
    fn untagged_deserialization_keeps_json_types() {
        let values: Vec<QueryValue> = serde_json::from_str(r#"[true, 1, "1"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                QueryValue::Bool(true),
                QueryValue::Number(1.into()),
                QueryValue::Text("1".to_string()),
            ]
        );
    }

    #[test]
    fn sanitize_turns_everything_into_text() {
        let params = QueryParams::from_pairs([
            ("logo", QueryValue::from(1_i64)),
            ("link", QueryValue::from(true)),
            ("label", QueryValue::from("MiXeD")),
        ]);
        let sanitized = params.sanitize();
        assert_eq!(sanitized.get("logo"), Some("1"));
        assert_eq!(sanitized.get("link"), Some("true"));
        assert_eq!(sanitized.get("label"), Some("MiXeD"));
    }

    #[test]
    fn repeated_keys_keep_order() {
        let params = QueryParams::from_pairs([("link", "a"), ("link", "b"), ("label", "")]);
        let sanitized = params.sanitize();
        assert_eq!(sanitized.get_all("link").collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(sanitized.get("label"), Some(""));
        assert_eq!(sanitized.get_non_empty("label"), None);
    }

    #[test]
    fn from_path_splits_category_and_subject() {
        let request = BadgeRequest::from_path("/npm/v/express.svg", QueryParams::new()).unwrap();
        assert_eq!(request.category.as_deref(), Some("npm"));
        assert_eq!(request.subject_path, vec!["v", "express"]);
        assert_eq!(request.extension, Extension::Svg);
    }

    #[test]
    fn from_path_single_segment_has_no_category() {
        let request = BadgeRequest::from_path("/thing.json", QueryParams::new()).unwrap();
        assert!(request.category.is_none());
        assert_eq!(request.subject_path, vec!["thing"]);
    }

    #[test]
    fn from_path_rejects_unknown_or_missing_extension() {
        assert!(BadgeRequest::from_path("/not/a/badge.js", QueryParams::new()).is_none());
        assert!(BadgeRequest::from_path("/npm/v/", QueryParams::new()).is_none());
        assert!(BadgeRequest::from_path("/", QueryParams::new()).is_none());
    }

    #[test]
    fn from_path_decodes_and_preserves_case() {
        let request =
            BadgeRequest::from_path("/badge/fRuiT%20Bowl-Apple-green.svg", QueryParams::new())
                .unwrap();
        assert_eq!(request.subject_path, vec!["fRuiT Bowl-Apple-green"]);
    }

    #[test]
    fn percent_decode_handles_malformed_escapes() {
        assert_eq!(percent_decode("a%2Fb"), "a/b");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
        assert_eq!(percent_decode("%e2%9c%93"), "\u{2713}");
    }
}
