// src/models/mod.rs

//! Domain models for the watcher.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod alert;
mod config;
mod item;
mod outcome;
mod rule;
mod selectors;

// Re-export all public types
pub use alert::{Alert, MessageFormat};
pub use config::{
    Config, HttpConfig, HttpMethod, KeeperConfig, LoggingConfig, NotifierConfig, RuleConfig,
    SourceConfig, WatchConfig,
};
pub use item::{Item, normalize_whitespace, title_identity};
pub use outcome::{CycleOutcome, CycleStatus};
pub use rule::MatchRule;
pub use selectors::{CssSelectors, JsonFields, StrategyConfig, default_strategies};
