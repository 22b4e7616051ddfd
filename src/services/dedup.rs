//! Process-lifetime deduplication of alerted items.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::Item;

/// Remembers every `source_id` already alerted.
///
/// The set only grows and is never persisted: a restart re-alerts whatever
/// is still listed upstream.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashMap<String, DateTime<Utc>>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep items never seen before and record them as seen.
    ///
    /// Repeats within `items` collapse to their first occurrence.
    pub fn filter_new(&mut self, items: Vec<Item>) -> Vec<Item> {
        let now = Utc::now();
        items
            .into_iter()
            .filter(|item| {
                if self.seen.contains_key(&item.source_id) {
                    return false;
                }
                self.seen.insert(item.source_id.clone(), now);
                true
            })
            .collect()
    }

    pub fn first_seen(&self, source_id: &str) -> Option<DateTime<Utc>> {
        self.seen.get(source_id).copied()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, id: Option<&str>) -> Item {
        Item::new(title, "https://example.com/a", id)
    }

    #[test]
    fn test_second_pass_is_empty() {
        let mut dedup = Deduplicator::new();
        let items = vec![item("Binance Will Delist A", Some("a")), item("Binance Will Delist B", Some("b"))];

        assert_eq!(dedup.filter_new(items.clone()).len(), 2);
        assert!(dedup.filter_new(items).is_empty());
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_title_casing_does_not_defeat_dedup() {
        let mut dedup = Deduplicator::new();
        let first = dedup.filter_new(vec![item("Binance Will Delist ABC Token", None)]);
        let second = dedup.filter_new(vec![item("BINANCE WILL DELIST  abc token", None)]);
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }

    #[test]
    fn test_repeats_within_one_batch() {
        let mut dedup = Deduplicator::new();
        let kept = dedup.filter_new(vec![item("X", Some("1")), item("X again", Some("1"))]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "X");
    }

    #[test]
    fn test_first_seen_is_recorded() {
        let mut dedup = Deduplicator::new();
        assert!(dedup.first_seen("id:1").is_none());
        dedup.filter_new(vec![item("X", Some("1"))]);
        assert!(dedup.first_seen("id:1").is_some());
    }
}
