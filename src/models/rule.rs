//! Title predicate deciding which announcements are alert-worthy.

use crate::models::{Item, RuleConfig, normalize_whitespace};

/// Case-insensitive title prefix match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRule {
    prefix: String,
}

impl MatchRule {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: normalize_whitespace(prefix).to_lowercase(),
        }
    }

    pub fn from_config(config: &RuleConfig) -> Self {
        Self::new(&config.title_prefix)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn matches_title(&self, title: &str) -> bool {
        normalize_whitespace(title)
            .to_lowercase()
            .starts_with(&self.prefix)
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.matches_title(&item.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_is_case_insensitive() {
        let rule = MatchRule::new("Binance Will Delist");
        assert!(rule.matches_title("Binance Will Delist ABC Token"));
        assert!(rule.matches_title("BINANCE WILL DELIST xyz"));
        assert!(rule.matches_title("  binance  will delist  ABC"));
    }

    #[test]
    fn test_prefix_must_be_at_start() {
        let rule = MatchRule::new("Binance Will Delist");
        assert!(!rule.matches_title("Notice: Binance Will Delist ABC"));
        assert!(!rule.matches_title("Binance Will List ABC"));
    }
}
