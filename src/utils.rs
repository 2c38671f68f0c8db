//! Small helpers for text cleanup, link resolution and logging.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Origin of every scraped page; relative links are resolved against it.
pub const SITE_ORIGIN: &str = "https://www.stockwatch.pl";

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace (including newlines and `&nbsp;`) into single spaces and trim.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE_RUN.replace_all(s.trim(), " ").into_owned()
}

/// Resolve `href` against [`SITE_ORIGIN`] unless it is already absolute.
///
/// Returns `None` for empty or unparseable links.
pub fn absolute_link(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    let base = Url::parse(SITE_ORIGIN).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Truncate a string for logging purposes.
///
/// Cuts on a character boundary at or below `max` bytes and appends
/// `"…(+N bytes)"`.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundaries() {
        // "ż" is two bytes; cutting at 1 would split it
        let result = truncate_for_log("żółw", 1);
        assert!(result.starts_with('…'));
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Raport\n  bieżący\t nr 12 "), "Raport bieżący nr 12");
        assert_eq!(collapse_whitespace("Orlen\u{a0}SA"), "Orlen SA");
    }

    #[test]
    fn test_absolute_link_prefixes_relative_paths() {
        assert_eq!(
            absolute_link("/komunikaty/orlen,123.aspx").as_deref(),
            Some("https://www.stockwatch.pl/komunikaty/orlen,123.aspx")
        );
    }

    #[test]
    fn test_absolute_link_keeps_absolute_urls() {
        assert_eq!(
            absolute_link("https://espi.example.com/r/1").as_deref(),
            Some("https://espi.example.com/r/1")
        );
    }

    #[test]
    fn test_absolute_link_rejects_empty() {
        assert_eq!(absolute_link("   "), None);
    }
}
