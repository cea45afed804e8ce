//! Stand-in badges returned instead of a rendered badge.
//!
//! The obsolete-format badge reads "410" but is served with status 200.
//! Existing consumers embed these images and depend on that status, so the
//! mismatch stays.

use crate::badge::Badge;

pub const NOT_FOUND_LABEL: &str = "404";
pub const NOT_FOUND_MESSAGE: &str = "badge not found";
pub const OBSOLETE_LABEL: &str = "410";
pub const OBSOLETE_MESSAGE: &str = "jpg no longer available";

/// Badge for paths that resolve to no renderer, or whose renderer failed.
pub fn not_found_badge() -> Badge {
    Badge::new(Some(NOT_FOUND_LABEL), NOT_FOUND_MESSAGE).with_color("red")
}

/// Badge for requests in an obsolete image format.
pub fn obsolete_format_badge() -> Badge {
    Badge::new(Some(OBSOLETE_LABEL), OBSOLETE_MESSAGE).with_color("lightgrey")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Extension;

    #[test]
    fn not_found_badge_text() {
        let body = not_found_badge().render(Extension::Svg).body;
        assert!(body.contains("404"));
        assert!(body.contains("badge not found"));
    }

    #[test]
    fn obsolete_badge_text() {
        let body = obsolete_format_badge().render(Extension::Jpg).body;
        assert!(body.contains("410"));
        assert!(body.contains("jpg no longer available"));
    }

    #[test]
    fn stand_ins_are_deterministic() {
        assert_eq!(not_found_badge(), not_found_badge());
        assert_eq!(
            obsolete_format_badge().to_svg(),
            obsolete_format_badge().to_svg()
        );
    }

    #[test]
    fn not_found_renders_as_json_too() {
        let body = not_found_badge().render(Extension::Json).body;
        assert!(body.contains("\"label\":\"404\""));
        assert!(body.contains("badge not found"));
    }
}
