// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Pasted HTML validation and warning banner injection.
//!
//! Implements the checks applied before a paste is stored:
//! - Size limit (inclusive)
//! - Presence of `<html>`/`</html>` and `<body>`/`</body>` (case-insensitive)
//! - Banner insertion as the first child of `<body>`
//!
//! This is tag-aware substring matching, not a parse. Scripts, styles and
//! everything else are left as the user wrote them.

use crate::config::ContentConfig;
use crate::error::{Result, SiteError, ValidationError};
use tracing::debug;

/// Element id carried by the injected banner.
pub const BANNER_ID: &str = "pastebin-warning-banner";

/// Warning banner inserted into every stored document.
///
/// Every declaration is `!important` and the z-index is the maximum so page
/// styles cannot hide it.
pub const BANNER_HTML: &str = concat!(
    r#"<div id="pastebin-warning-banner" role="alert" style=""#,
    "all:initial !important;",
    "display:block !important;",
    "position:fixed !important;",
    "top:0 !important;left:0 !important;right:0 !important;",
    "z-index:2147483647 !important;",
    "box-sizing:border-box !important;",
    "padding:8px 12px !important;",
    "background:#b91c1c !important;",
    "color:#ffffff !important;",
    "font:bold 14px/1.4 sans-serif !important;",
    "text-align:center !important;",
    "opacity:1 !important;visibility:visible !important;",
    "pointer-events:none !important;",
    r#"">"#,
    "Warning: this page was published anonymously by a user of this pastebin. ",
    "Do not enter passwords, payment details or other personal information.",
    "</div>"
);

/// Validates pasted HTML and injects the warning banner.
pub struct ContentSanitizer {
    config: ContentConfig,
}

impl ContentSanitizer {
    /// Create a new sanitizer with the given configuration.
    pub fn new(config: ContentConfig) -> Self {
        Self { config }
    }

    /// Reject content larger than the configured limit.
    pub fn check_size(&self, raw: &str) -> Result<()> {
        if raw.len() > self.config.max_bytes {
            debug!(size = raw.len(), limit = self.config.max_bytes, "Content too large");
            return Err(SiteError::PayloadTooLarge {
                limit: self.config.max_bytes,
                actual: raw.len(),
            });
        }
        Ok(())
    }

    /// Validate the document structure without modifying it.
    pub fn validate_structure(&self, raw: &str) -> Result<()> {
        let lower = raw.to_ascii_lowercase();

        if find_open_tag(&lower, "html").is_none() {
            return Err(ValidationError::MissingTag("<html>").into());
        }
        if !lower.contains("</html>") {
            return Err(ValidationError::MissingTag("</html>").into());
        }
        if find_open_tag(&lower, "body").is_none() {
            return Err(ValidationError::MissingTag("<body>").into());
        }
        if !lower.contains("</body>") {
            return Err(ValidationError::MissingTag("</body>").into());
        }
        Ok(())
    }

    /// Validate `raw` and return it with the banner inserted after `<body ...>`.
    pub fn sanitize(&self, raw: &str) -> Result<String> {
        self.check_size(raw)?;
        self.validate_structure(raw)?;

        let lower = raw.to_ascii_lowercase();
        let insert_at = find_open_tag(&lower, "body")
            .and_then(|start| tag_end(&lower, start))
            .ok_or(ValidationError::MissingTag("<body>"))?;

        let mut out = String::with_capacity(raw.len() + BANNER_HTML.len());
        out.push_str(&raw[..insert_at]);
        out.push_str(BANNER_HTML);
        out.push_str(&raw[insert_at..]);
        Ok(out)
    }
}

/// Byte offset of the first `<name` that is a whole tag name.
///
/// `lower` must already be ASCII-lowercased; offsets are valid in the
/// original string because ASCII lowercasing preserves byte positions.
fn find_open_tag(lower: &str, name: &str) -> Option<usize> {
    let needle = format!("<{name}");
    let bytes = lower.as_bytes();
    let mut from = 0;

    while let Some(pos) = lower[from..].find(&needle) {
        let start = from + pos;
        let after = start + needle.len();
        match bytes.get(after) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' || *b == b'/' => return Some(start),
            Some(_) => from = after,
            None => return None,
        }
    }
    None
}

/// Offset just past the `>` closing the tag starting at `start`.
///
/// Quoted attribute values may contain `>`.
fn tag_end(lower: &str, start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in lower.as_bytes().iter().enumerate().skip(start) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'\'' => quote = Some(b),
            None if b == b'>' => return Some(i + 1),
            None => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitizer() -> ContentSanitizer {
        ContentSanitizer::new(ContentConfig::default())
    }

    #[test]
    fn test_banner_is_first_child_of_body() {
        let html = r#"<!doctype html><html><head></head><body class="x"><h1>Hi</h1></body></html>"#;
        let out = sanitizer().sanitize(html).unwrap();
        let expected = format!(
            r#"<!doctype html><html><head></head><body class="x">{BANNER_HTML}<h1>Hi</h1></body></html>"#
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_tags_are_case_insensitive() {
        let html = "<HTML><BODY>x</BODY></HTML>";
        let out = sanitizer().sanitize(html).unwrap();
        assert!(out.starts_with("<HTML><BODY><div id=\"pastebin-warning-banner\""));
        assert!(out.ends_with("x</BODY></HTML>"));
    }

    #[test]
    fn test_quoted_gt_in_body_attributes() {
        let html = r#"<html><body onload="if(a>b){}" data-x='>'>content</body></html>"#;
        let out = sanitizer().sanitize(html).unwrap();
        let prefix = r#"<html><body onload="if(a>b){}" data-x='>'>"#;
        assert!(out.starts_with(prefix));
        assert!(out[prefix.len()..].starts_with(BANNER_HTML));
    }

    #[test]
    fn test_lookalike_tags_do_not_count() {
        let result = sanitizer().sanitize("<html><bodyguard></bodyguard></body></html>");
        assert!(matches!(
            result,
            Err(SiteError::Validation(ValidationError::MissingTag("<body>")))
        ));
    }

    #[test]
    fn test_missing_tags_reported() {
        let cases = [
            ("<body></body>", "<html>"),
            ("<html><body></body>", "</html>"),
            ("<html></html>", "<body>"),
            ("<html><body></html>", "</body>"),
            ("", "<html>"),
        ];
        for (html, tag) in cases {
            match sanitizer().sanitize(html) {
                Err(SiteError::Validation(ValidationError::MissingTag(t))) => assert_eq!(t, tag),
                other => panic!("{html:?} should be missing {tag}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unterminated_body_tag_rejected() {
        let result = sanitizer().sanitize("<html></body></html><body class=\"open");
        assert!(matches!(
            result,
            Err(SiteError::Validation(ValidationError::MissingTag("<body>")))
        ));
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        let sanitizer = sanitizer();
        let shell = "<html><body></body></html>";
        let at_limit = format!("{shell}{}", " ".repeat(512_000 - shell.len()));
        assert_eq!(at_limit.len(), 512_000);
        assert!(sanitizer.sanitize(&at_limit).is_ok());

        let over = format!("{at_limit} ");
        assert!(matches!(
            sanitizer.sanitize(&over),
            Err(SiteError::PayloadTooLarge { limit: 512_000, actual: 512_001 })
        ));
    }

    #[test]
    fn test_multibyte_content_preserved() {
        let html = "<html><body>日本語 ✓</body></html>";
        let out = sanitizer().sanitize(html).unwrap();
        assert!(out.contains("日本語 ✓"));
        assert_eq!(out.matches(BANNER_ID).count(), 1);
    }
}
