//! Service layer for the watcher.
//!
//! - Source fetching and extraction (`HttpSourceReader`, `StrategyChain`)
//! - Seen-item tracking (`Deduplicator`)
//! - Outbound alerts (`TelegramNotifier`, `ConsoleNotifier`)
//! - Websocket liveness side-channel (`ConnectionKeeper`)

mod dedup;
mod keeper;
mod notifier;
mod reader;
pub mod strategies;

pub use dedup::Deduplicator;
pub use keeper::{ConnectionKeeper, KeeperError};
pub use notifier::{ConsoleNotifier, Notifier, TelegramNotifier};
pub use reader::{HttpSourceReader, SourceReader};
pub use strategies::{Extraction, ExtractionStrategy, StrategyChain};
