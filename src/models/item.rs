//! Announcement item data structure.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A candidate announcement extracted from the upstream feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    /// Announcement title, whitespace-normalized
    pub title: String,

    /// Absolute URL of the announcement
    pub link: String,

    /// Stable identity used for deduplication
    pub source_id: String,
}

impl Item {
    /// Build an item, deriving `source_id` from the upstream code when one
    /// is present and from the normalized title otherwise.
    pub fn new(title: &str, link: impl Into<String>, upstream_id: Option<&str>) -> Self {
        let title = normalize_whitespace(title);
        let source_id = match upstream_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => format!("id:{id}"),
            None => title_identity(&title),
        };

        Self {
            title,
            link: link.into(),
            source_id,
        }
    }
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identity derived from title text alone: casing and spacing do not matter.
pub fn title_identity(title: &str) -> String {
    let normalized = normalize_whitespace(title).to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("t:{}", hex::encode(&digest[..16]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_id_wins() {
        let item = Item::new("Binance Will Delist ABC", "https://x/1", Some("abc123"));
        assert_eq!(item.source_id, "id:abc123");
    }

    #[test]
    fn test_blank_upstream_id_falls_back_to_title() {
        let item = Item::new("Binance Will Delist ABC", "https://x/1", Some("  "));
        assert!(item.source_id.starts_with("t:"));
    }

    #[test]
    fn test_title_identity_ignores_case_and_spacing() {
        let a = Item::new("Binance Will Delist  ABC Token", "https://x/1", None);
        let b = Item::new("  binance will delist abc token ", "https://x/2", None);
        assert_eq!(a.source_id, b.source_id);
        assert_eq!(a.title, "Binance Will Delist ABC Token");
    }
}
