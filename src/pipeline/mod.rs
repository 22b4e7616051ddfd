//! Watch loop and the policies it applies between cycles.
//!
//! - `WatchLoop`: fetch, filter, dedup and notify, forever
//! - `BackoffPolicy`: delay after failed fetches
//! - `DriftDetector`: escalates persistent empty extraction
//! - `AlertDispatcher`: delivery with one retry

pub mod backoff;
pub mod dispatch;
pub mod drift;
pub mod watch;

pub use backoff::BackoffPolicy;
pub use dispatch::AlertDispatcher;
pub use drift::{DriftConfig, DriftDetector, DriftStatus};
pub use watch::{FailureCounters, WatchLoop, WatchState, log_outcome};
