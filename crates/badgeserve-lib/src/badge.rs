//! Badge model and the SVG/JSON serialization primitive.
//!
//! Every body the service returns, real or stand-in, goes through
//! [`Badge::render`]. Text is emitted exactly as given (escaped, never
//! case-folded).

use serde::Serialize;

use crate::format::Extension;
use crate::request::RenderParams;

/// Default message color.
pub const DEFAULT_COLOR: &str = "#9f9f9f";

/// Default label color.
pub const DEFAULT_LABEL_COLOR: &str = "#555";

const NAMED_COLORS: &[(&str, &str)] = &[
    ("brightgreen", "#4c1"),
    ("green", "#97ca00"),
    ("yellowgreen", "#a4a61d"),
    ("yellow", "#dfb317"),
    ("orange", "#fe7d37"),
    ("red", "#e05d44"),
    ("blue", "#007ec6"),
    ("lightgrey", "#9f9f9f"),
    ("grey", "#555"),
    ("gray", "#555"),
    ("success", "#4c1"),
    ("important", "#fe7d37"),
    ("critical", "#e05d44"),
    ("informational", "#007ec6"),
    ("inactive", "#9f9f9f"),
];

/// Resolve a named or hex color to a CSS hex value.
///
/// Named colors are matched case-insensitively; hex values may omit the `#`.
/// Anything else yields `None`.
pub fn normalize_color(color: &str) -> Option<String> {
    let color = color.trim();
    if let Some((_, hex)) = NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(color))
    {
        return Some((*hex).to_string());
    }

    let digits = color.strip_prefix('#').unwrap_or(color);
    let is_hex = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    is_hex.then(|| format!("#{}", digits))
}

/// A badge ready to be serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub label: Option<String>,
    pub message: String,
    /// CSS hex color of the message panel.
    pub color: String,
    /// CSS hex color of the label panel.
    pub label_color: String,
    /// Click targets; the first is used by SVG output.
    pub link: Vec<String>,
    /// `data:image/...` URI drawn before the label.
    pub logo: Option<String>,
    /// Cache lifetime requested by the renderer, if any.
    pub cache_seconds: Option<u64>,
}

/// A serialized badge body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBadge {
    pub body: String,
    pub content_type: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonBadge<'a> {
    label: &'a str,
    message: &'a str,
    color: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    label_color: Option<&'a str>,
    #[serde(skip_serializing_if = "no_links")]
    link: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    logo: Option<&'a str>,
    name: &'a str,
    value: &'a str,
}

fn no_links(link: &&[String]) -> bool {
    link.is_empty()
}

impl Badge {
    pub fn new(label: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            label: label.map(str::to_string),
            message: message.into(),
            color: DEFAULT_COLOR.to_string(),
            label_color: DEFAULT_LABEL_COLOR.to_string(),
            link: Vec::new(),
            logo: None,
            cache_seconds: None,
        }
    }

    /// Set the message color; unknown colors keep the current one.
    pub fn with_color(mut self, color: &str) -> Self {
        if let Some(hex) = normalize_color(color) {
            self.color = hex;
        }
        self
    }

    /// Set the label color; unknown colors keep the current one.
    pub fn with_label_color(mut self, color: &str) -> Self {
        if let Some(hex) = normalize_color(color) {
            self.label_color = hex;
        }
        self
    }

    /// Apply the query overrides common to every badge: `label`, `color`,
    /// `labelColor`, `link`, `logo`, and `cacheSeconds`.
    ///
    /// Values that make no sense for their parameter are ignored, so a
    /// parameter sent as `1` or `true` never fails the render.
    pub fn apply_overrides(mut self, params: &RenderParams) -> Self {
        if let Some(label) = params.get("label") {
            self.label = Some(label.to_string());
        }
        if let Some(color) = params.get_non_empty("color") {
            self = self.with_color(color);
        }
        if let Some(color) = params.get_non_empty("labelColor") {
            self = self.with_label_color(color);
        }

        let links: Vec<String> = params
            .get_all("link")
            .filter(|l| l.starts_with("http://") || l.starts_with("https://"))
            .map(str::to_string)
            .collect();
        if !links.is_empty() {
            self.link = links;
        }

        if let Some(logo) = params.get("logo").filter(|l| l.starts_with("data:image/")) {
            self.logo = Some(logo.to_string());
        }

        if let Some(seconds) = params
            .get("cacheSeconds")
            .and_then(|s| s.trim().parse::<u64>().ok())
        {
            self.cache_seconds = Some(seconds);
        }

        self
    }

    /// Serialize in the requested format. Non-modern formats render as SVG.
    pub fn render(&self, format: Extension) -> RenderedBadge {
        match format {
            Extension::Json => RenderedBadge {
                body: self.to_json(),
                content_type: Extension::Json.content_type(),
            },
            _ => RenderedBadge {
                body: self.to_svg(),
                content_type: Extension::Svg.content_type(),
            },
        }
    }

    pub fn to_json(&self) -> String {
        let label = self.label.as_deref().unwrap_or("");
        let doc = JsonBadge {
            label,
            message: &self.message,
            color: &self.color,
            label_color: self.label.as_ref().map(|_| self.label_color.as_str()),
            link: &self.link,
            logo: self.logo.as_deref(),
            name: label,
            value: &self.message,
        };
        // Only strings and string slices; serialization cannot fail.
        serde_json::to_string(&doc).unwrap_or_default()
    }

    pub fn to_svg(&self) -> String {
        let label = self.label.as_deref().filter(|l| !l.is_empty());
        let logo_width = if self.logo.is_some() { 14 + 3 } else { 0 };

        let label_width = match label {
            Some(text) => text_width(text) + 10 + logo_width,
            None if self.logo.is_some() => logo_width + 7,
            None => 0,
        };
        let message_width = text_width(&self.message) + 10;
        let total_width = label_width + message_width;

        let title = match label {
            Some(text) => format!("{}: {}", escape_xml(text), escape_xml(&self.message)),
            None => escape_xml(&self.message),
        };

        let mut svg = String::with_capacity(1024);
        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="20" role="img" aria-label="{t}"><title>{t}</title>"#,
            w = total_width,
            t = title
        ));
        svg.push_str(&format!(
            r##"<linearGradient id="s" x2="0" y2="100%"><stop offset="0" stop-color="#bbb" stop-opacity=".1"/><stop offset="1" stop-opacity=".1"/></linearGradient><clipPath id="r"><rect width="{w}" height="20" rx="3" fill="#fff"/></clipPath>"##,
            w = total_width
        ));

        if let Some(href) = self.link.first() {
            svg.push_str(&format!(r#"<a target="_blank" xlink:href="{}">"#, escape_xml(href)));
        }

        svg.push_str(&format!(
            r##"<g clip-path="url(#r)"><rect width="{lw}" height="20" fill="{lc}"/><rect x="{lw}" width="{mw}" height="20" fill="{mc}"/><rect width="{w}" height="20" fill="url(#s)"/></g>"##,
            lw = label_width,
            mw = message_width,
            w = total_width,
            lc = escape_xml(&self.label_color),
            mc = escape_xml(&self.color),
        ));

        svg.push_str(
            r##"<g fill="#fff" text-anchor="middle" font-family="Verdana,Geneva,DejaVu Sans,sans-serif" font-size="11">"##,
        );
        if let Some(logo) = &self.logo {
            svg.push_str(&format!(
                r#"<image x="5" y="3" width="14" height="14" xlink:href="{}"/>"#,
                escape_xml(logo)
            ));
        }
        if let Some(text) = label {
            let x = logo_width + (label_width - logo_width) / 2;
            svg.push_str(&format!(r#"<text x="{}" y="14">{}</text>"#, x, escape_xml(text)));
        }
        svg.push_str(&format!(
            r#"<text x="{}" y="14">{}</text></g>"#,
            label_width + message_width / 2,
            escape_xml(&self.message)
        ));

        if !self.link.is_empty() {
            svg.push_str("</a>");
        }
        svg.push_str("</svg>");
        svg
    }
}

/// Approximate rendered width of `text` in 11px Verdana.
fn text_width(text: &str) -> u32 {
    text.chars()
        .map(|c| match c {
            'i' | 'l' | 'j' | '.' | ',' | ':' | ';' | '|' | '!' | '\'' => 3,
            'f' | 'r' | 't' | 'I' | ' ' | '(' | ')' | '[' | ']' => 4,
            'm' | 'w' | 'M' | 'W' | '@' | '%' => 10,
            c if c.is_ascii_uppercase() => 8,
            c if c.is_ascii() => 7,
            _ => 11,
        })
        .sum()
}

/// Escape text for use in XML content and attribute values.
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::QueryParams;

    #[test]
    fn named_and_hex_colors_normalize() {
        assert_eq!(normalize_color("brightgreen").as_deref(), Some("#4c1"));
        assert_eq!(normalize_color("Blue").as_deref(), Some("#007ec6"));
        assert_eq!(normalize_color("ABCDEF").as_deref(), Some("#ABCDEF"));
        assert_eq!(normalize_color("#f0f").as_deref(), Some("#f0f"));
        assert_eq!(normalize_color("1"), None);
        assert_eq!(normalize_color("true"), None);
        assert_eq!(normalize_color("javascript:alert(1)"), None);
    }

    #[test]
    fn svg_preserves_label_case() {
        let svg = Badge::new(Some("fRuiT"), "apple").to_svg();
        assert!(svg.contains(">fRuiT<"));
        assert!(!svg.contains("fruit"));
    }

    #[test]
    fn svg_escapes_markup() {
        let svg = Badge::new(Some("<b>"), "a & b").to_svg();
        assert!(svg.contains("&lt;b&gt;"));
        assert!(svg.contains("a &amp; b"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn svg_without_label_has_single_panel_text() {
        let svg = Badge::new(None, "only").to_svg();
        assert!(svg.contains("<title>only</title>"));
        assert_eq!(svg.matches("<text").count(), 1);
    }

    #[test]
    fn json_contains_legacy_name_value_fields() {
        let json = Badge::new(Some("build"), "passing")
            .with_color("green")
            .to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["label"], "build");
        assert_eq!(value["name"], "build");
        assert_eq!(value["message"], "passing");
        assert_eq!(value["value"], "passing");
        assert_eq!(value["color"], "#97ca00");
        assert!(value.get("link").is_none());
    }

    #[test]
    fn render_picks_content_type() {
        let badge = Badge::new(Some("a"), "b");
        assert_eq!(badge.render(Extension::Json).content_type, "application/json");
        assert!(badge
            .render(Extension::Jpg)
            .content_type
            .starts_with("image/svg+xml"));
    }

    #[test]
    fn overrides_tolerate_numeric_and_boolean_text() {
        let params = QueryParams::from_pairs([
            ("logo", crate::QueryValue::from(1_i64)),
            ("link", crate::QueryValue::from(true)),
            ("color", crate::QueryValue::from(0_i64)),
            ("cacheSeconds", crate::QueryValue::from(false)),
        ])
        .sanitize();
        let badge = Badge::new(Some("l"), "m").apply_overrides(&params);
        assert!(badge.logo.is_none());
        assert!(badge.link.is_empty());
        assert_eq!(badge.color, DEFAULT_COLOR);
        assert!(badge.cache_seconds.is_none());
        assert!(!badge.to_svg().is_empty());
    }

    #[test]
    fn overrides_apply_label_links_and_logo() {
        let params = QueryParams::from_pairs([
            ("label", "MiXeD"),
            ("link", "https://a.example"),
            ("link", "https://b.example"),
            ("logo", "data:image/png;base64,AAAA"),
            ("cacheSeconds", "3600"),
        ])
        .sanitize();
        let badge = Badge::new(Some("orig"), "m").apply_overrides(&params);
        assert_eq!(badge.label.as_deref(), Some("MiXeD"));
        assert_eq!(badge.link.len(), 2);
        assert_eq!(badge.cache_seconds, Some(3600));

        let svg = badge.to_svg();
        assert!(svg.contains("xlink:href=\"https://a.example\""));
        assert!(svg.contains("<image"));
    }
}
