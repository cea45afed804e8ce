//! Output formats and their routing class.

use std::fmt;
use std::str::FromStr;

/// File extension recognized on a badge path. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Extension {
    Svg,
    Json,
    Png,
    Gif,
    Jpg,
}

/// How a request for a given extension is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatClass {
    /// Rendered directly by this service.
    Modern,
    /// Redirected to the separately hosted raster renderer.
    LegacyRaster,
    /// Neither rendered nor redirected; answered with a stand-in badge.
    Obsolete,
}

impl Extension {
    pub const ALL: [Extension; 5] = [
        Extension::Svg,
        Extension::Json,
        Extension::Png,
        Extension::Gif,
        Extension::Jpg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Extension::Svg => "svg",
            Extension::Json => "json",
            Extension::Png => "png",
            Extension::Gif => "gif",
            Extension::Jpg => "jpg",
        }
    }

    pub fn class(self) -> FormatClass {
        match self {
            Extension::Svg | Extension::Json => FormatClass::Modern,
            Extension::Png | Extension::Gif => FormatClass::LegacyRaster,
            Extension::Jpg => FormatClass::Obsolete,
        }
    }

    /// Content type of a body rendered in this format. Only meaningful for
    /// modern formats; everything else is answered with SVG.
    pub fn content_type(self) -> &'static str {
        match self {
            Extension::Json => "application/json",
            _ => "image/svg+xml;charset=utf-8",
        }
    }

    /// Split a trailing path segment into stem and extension.
    ///
    /// Returns `None` when the segment has no dot, an empty stem, or an
    /// extension outside the recognized set.
    pub fn split_segment(segment: &str) -> Option<(&str, Extension)> {
        let (stem, ext) = segment.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some((stem, ext.parse().ok()?))
    }
}

impl FromStr for Extension {
    type Err = UnknownExtension;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Extension::ALL
            .into_iter()
            .find(|ext| ext.as_str() == s)
            .ok_or_else(|| UnknownExtension(s.to_string()))
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing an extension outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownExtension(pub String);

impl fmt::Display for UnknownExtension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized extension: {}", self.0)
    }
}

impl std::error::Error for UnknownExtension {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_is_fixed() {
        assert_eq!(Extension::Svg.class(), FormatClass::Modern);
        assert_eq!(Extension::Json.class(), FormatClass::Modern);
        assert_eq!(Extension::Png.class(), FormatClass::LegacyRaster);
        assert_eq!(Extension::Gif.class(), FormatClass::LegacyRaster);
        assert_eq!(Extension::Jpg.class(), FormatClass::Obsolete);
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!("svg".parse::<Extension>(), Ok(Extension::Svg));
        assert!("SVG".parse::<Extension>().is_err());
        assert!("js".parse::<Extension>().is_err());
    }

    #[test]
    fn split_segment_uses_last_dot() {
        assert_eq!(
            Extension::split_segment("v1.2.3.svg"),
            Some(("v1.2.3", Extension::Svg))
        );
        assert_eq!(Extension::split_segment("badge.js"), None);
        assert_eq!(Extension::split_segment("badge"), None);
        assert_eq!(Extension::split_segment(".svg"), None);
    }

    #[test]
    fn json_has_its_own_content_type() {
        assert_eq!(Extension::Json.content_type(), "application/json");
        assert!(Extension::Svg.content_type().starts_with("image/svg+xml"));
    }
}
