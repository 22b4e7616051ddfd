//! Utility functions and helpers.

pub mod http;

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Extract an announcement ID from a URL (looks for common patterns).
///
/// Announcement links end in either a numeric id or a 32-char hex code,
/// optionally followed by a query string.
pub fn extract_announcement_id(url: &str) -> Option<String> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        [
            r"/announcement/(?:[^/?#]*-)?([0-9a-f]{32}|\d+)(?:[/?#]|$)",
            r"[?&](?:id|code|articleId)=([0-9A-Za-z]+)",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    });

    patterns.iter().find_map(|pattern| {
        pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|id| id.as_str().to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_url() {
        let base = Url::parse("https://www.binance.com/en/").unwrap();
        assert_eq!(
            resolve_url(&base, "/en/support/announcement/123"),
            "https://www.binance.com/en/support/announcement/123"
        );
        assert_eq!(
            resolve_url(&base, "support/announcement/123"),
            "https://www.binance.com/en/support/announcement/123"
        );
        assert_eq!(
            resolve_url(&base, "https://other.com/x"),
            "https://other.com/x"
        );
    }

    #[test]
    fn test_extract_announcement_id() {
        assert_eq!(
            extract_announcement_id("https://www.binance.com/en/support/announcement/123"),
            Some("123".to_string())
        );
        assert_eq!(
            extract_announcement_id(
                "https://www.binance.com/en/support/announcement/binance-will-delist-abc-0123456789abcdef0123456789abcdef"
            ),
            Some("0123456789abcdef0123456789abcdef".to_string())
        );
        assert_eq!(
            extract_announcement_id("https://example.com/view?id=77"),
            Some("77".to_string())
        );
        assert_eq!(extract_announcement_id("https://example.com/about"), None);
    }
}
