//! Extraction drift detection.
//!
//! An empty extraction is normally fine ("nothing listed right now"), but a
//! source that used to return items and then stays empty for many cycles
//! has most likely changed its format. The detector reports that once per
//! empty streak.
//!
//! > If every strategy comes up empty for **N** consecutive cycles after
//! > items were previously found, raise a single ambiguity warning.

/// Drift detector configuration.
#[derive(Debug, Clone)]
pub struct DriftConfig {
    /// Consecutive empty cycles before escalation. Default: 10
    pub threshold: u32,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self { threshold: 10 }
    }
}

/// Result of recording one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriftStatus {
    /// Items were extracted
    Healthy { item_count: usize },
    /// Nothing extracted, but no items were ever seen (cold start)
    ColdStart,
    /// Empty, below the threshold or already escalated
    Empty { consecutive: u32 },
    /// Empty streak just reached the threshold: escalate now
    Triggered { consecutive: u32 },
}

/// Tracks consecutive empty extractions.
#[derive(Debug, Clone, Default)]
pub struct DriftDetector {
    config: DriftConfig,
    ever_found: bool,
    consecutive_empty: u32,
}

impl DriftDetector {
    pub fn with_config(config: DriftConfig) -> Self {
        Self {
            config,
            ever_found: false,
            consecutive_empty: 0,
        }
    }

    pub fn consecutive_empty(&self) -> u32 {
        self.consecutive_empty
    }

    /// Record the number of items extracted by a successful fetch.
    pub fn record(&mut self, item_count: usize) -> DriftStatus {
        if item_count > 0 {
            if self.consecutive_empty >= self.config.threshold {
                log::info!(
                    "Extraction recovered after {} empty cycle(s)",
                    self.consecutive_empty
                );
            }
            self.ever_found = true;
            self.consecutive_empty = 0;
            return DriftStatus::Healthy { item_count };
        }

        if !self.ever_found {
            return DriftStatus::ColdStart;
        }

        self.consecutive_empty = self.consecutive_empty.saturating_add(1);
        if self.consecutive_empty == self.config.threshold.max(1) {
            log::warn!(
                "Drift: no items extracted for {} consecutive cycles",
                self.consecutive_empty
            );
            DriftStatus::Triggered {
                consecutive: self.consecutive_empty,
            }
        } else {
            log::info!(
                "No items extracted ({} consecutive empty cycle(s))",
                self.consecutive_empty
            );
            DriftStatus::Empty {
                consecutive: self.consecutive_empty,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(threshold: u32) -> DriftDetector {
        DriftDetector::with_config(DriftConfig { threshold })
    }

    #[test]
    fn test_cold_start_never_triggers() {
        let mut d = detector(3);
        for _ in 0..10 {
            assert_eq!(d.record(0), DriftStatus::ColdStart);
        }
    }

    #[test]
    fn test_triggers_once_per_streak() {
        let mut d = detector(3);
        d.record(5);
        assert_eq!(d.record(0), DriftStatus::Empty { consecutive: 1 });
        assert_eq!(d.record(0), DriftStatus::Empty { consecutive: 2 });
        assert_eq!(d.record(0), DriftStatus::Triggered { consecutive: 3 });
        assert_eq!(d.record(0), DriftStatus::Empty { consecutive: 4 });
    }

    #[test]
    fn test_items_reset_streak() {
        let mut d = detector(2);
        d.record(1);
        d.record(0);
        assert_eq!(d.record(0), DriftStatus::Triggered { consecutive: 2 });
        assert_eq!(d.record(4), DriftStatus::Healthy { item_count: 4 });
        assert_eq!(d.consecutive_empty(), 0);
        d.record(0);
        assert_eq!(d.record(0), DriftStatus::Triggered { consecutive: 2 });
    }
}
