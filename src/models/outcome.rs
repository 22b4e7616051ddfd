//! Per-cycle summary used for logging.

use chrono::{DateTime, Utc};

/// How a watch cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Ok,
    SourceError,
    NotifyError,
    ParseError,
}

/// Summary of one watch cycle. Never persisted.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub status: CycleStatus,
    /// Items returned by the source reader
    pub items_found: usize,
    /// Items passing the match rule
    pub items_matched: usize,
    /// Alerts delivered
    pub items_notified: usize,
    /// Alerts that could not be delivered
    pub items_failed: usize,
    /// Extraction strategy that produced the items
    pub strategy: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl CycleOutcome {
    pub fn new(status: CycleStatus) -> Self {
        Self {
            status,
            items_found: 0,
            items_matched: 0,
            items_notified: 0,
            items_failed: 0,
            strategy: None,
            timestamp: Utc::now(),
        }
    }
}
