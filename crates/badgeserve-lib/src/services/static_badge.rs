//! Colorscheme badges: content carried in the path or the query string.

use futures::FutureExt;

use super::{BadgeService, RenderFuture};
use crate::badge::Badge;
use crate::error::RenderError;
use crate::request::RenderParams;

/// `/badge/<label>-<message>-<color>` and `/badge/<message>-<color>`.
///
/// Within the content `--` is a literal dash, `__` a literal underscore, and a
/// single `_` a space. A leading `:` on the content is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBadgeService;

/// `/:<label>-<message>-<color>`: the colorscheme form without a category.
/// The leading `:` is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootStaticBadgeService;

/// `/static/v1?label=..&message=..&color=..`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryStaticBadgeService;

/// Split badge content into `(label, message, color)`.
///
/// Returns `None` unless the content has two or three dash-separated parts.
pub fn parse_badge_content(content: &str) -> Option<(Option<String>, String, String)> {
    let mut parts: Vec<String> = split_on_single_dash(content)
        .iter()
        .map(|part| unescape_underscores(part))
        .collect();

    match parts.len() {
        2 => {
            let color = parts.pop()?;
            let message = parts.pop()?;
            Some((None, message, color))
        }
        3 => {
            let color = parts.pop()?;
            let message = parts.pop()?;
            let label = parts.pop()?;
            Some((Some(label), message, color))
        }
        _ => None,
    }
}

fn strip_colon(content: &str) -> &str {
    content.strip_prefix(':').unwrap_or(content)
}

fn render_colorscheme(subject: &[String]) -> Result<Badge, RenderError> {
    let content = subject.join("/");
    let (label, message, color) =
        parse_badge_content(strip_colon(&content)).ok_or_else(|| RenderError::NotFound {
            subject: content.clone(),
        })?;
    Ok(Badge::new(label.as_deref(), message).with_color(&color))
}

fn split_on_single_dash(content: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '-' {
            current.push(c);
        } else if chars.peek() == Some(&'-') {
            chars.next();
            current.push('-');
        } else {
            parts.push(std::mem::take(&mut current));
        }
    }
    parts.push(current);
    parts
}

fn unescape_underscores(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    let mut chars = part.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '_' {
            out.push(c);
        } else if chars.peek() == Some(&'_') {
            chars.next();
            out.push('_');
        } else {
            out.push(' ');
        }
    }
    out
}

impl BadgeService for StaticBadgeService {
    fn category(&self) -> Option<&str> {
        Some("badge")
    }

    fn accepts(&self, subject: &[String]) -> bool {
        matches!(subject, [content] if parse_badge_content(strip_colon(content)).is_some())
    }

    fn render<'a>(&'a self, subject: &'a [String], _params: &'a RenderParams) -> RenderFuture<'a> {
        async move { render_colorscheme(subject) }.boxed()
    }
}

impl BadgeService for RootStaticBadgeService {
    fn category(&self) -> Option<&str> {
        None
    }

    fn accepts(&self, subject: &[String]) -> bool {
        match subject {
            [content] => content
                .strip_prefix(':')
                .is_some_and(|rest| parse_badge_content(rest).is_some()),
            _ => false,
        }
    }

    fn render<'a>(&'a self, subject: &'a [String], _params: &'a RenderParams) -> RenderFuture<'a> {
        async move { render_colorscheme(subject) }.boxed()
    }
}

impl BadgeService for QueryStaticBadgeService {
    fn category(&self) -> Option<&str> {
        Some("static")
    }

    fn accepts(&self, subject: &[String]) -> bool {
        matches!(subject, [version] if version == "v1")
    }

    fn render<'a>(&'a self, _subject: &'a [String], params: &'a RenderParams) -> RenderFuture<'a> {
        async move {
            let message = params
                .get_non_empty("message")
                .ok_or_else(|| RenderError::MissingParameter {
                    name: "message".to_string(),
                })?;
            Ok(Badge::new(params.get("label"), message))
        }
        .boxed()
    }
}
