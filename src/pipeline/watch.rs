// src/pipeline/watch.rs

//! The watch loop.
//!
//! One worker drives every check: fetch through the [`SourceReader`], keep
//! items passing the [`MatchRule`], drop the ones already seen and push an
//! alert for each survivor. Failed fetches back off, everything else sleeps
//! until the next timer tick or keeper signal. No error below this level
//! stops the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, FetchErrorKind};
use crate::models::{Alert, Config, CycleOutcome, CycleStatus, Item, MatchRule, SourceConfig};
use crate::services::{Deduplicator, SourceReader};

use super::backoff::BackoffPolicy;
use super::dispatch::AlertDispatcher;
use super::drift::{DriftConfig, DriftDetector, DriftStatus};

/// Where the loop is in its current cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Fetching,
    Filtering,
    Notifying,
    Sleeping,
    /// Waiting the given delay after a failed fetch
    Backoff(Duration),
}

/// Consecutive fetch failures, one counter per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureCounters {
    pub network: u32,
    pub upstream: u32,
    pub parse: u32,
}

impl FailureCounters {
    fn record(&mut self, kind: FetchErrorKind) {
        let counter = match kind {
            FetchErrorKind::Network => &mut self.network,
            FetchErrorKind::UpstreamStatus => &mut self.upstream,
            FetchErrorKind::Parse => &mut self.parse,
        };
        *counter = counter.saturating_add(1);
    }

    /// Failures in the current streak, all kinds.
    pub fn total(&self) -> u32 {
        self.network
            .saturating_add(self.upstream)
            .saturating_add(self.parse)
    }
}

/// Periodic delisting watcher.
pub struct WatchLoop {
    reader: Arc<dyn SourceReader>,
    dispatcher: AlertDispatcher,
    source: SourceConfig,
    rule: MatchRule,
    seen: Deduplicator,
    backoff: BackoffPolicy,
    drift: DriftDetector,
    counters: FailureCounters,
    failure_alert_threshold: u32,
    failure_alerted: bool,
    interval: Duration,
    shutdown_grace: Duration,
    signal: Option<Arc<Notify>>,
    state: WatchState,
}

impl WatchLoop {
    pub fn new(reader: Arc<dyn SourceReader>, dispatcher: AlertDispatcher, config: &Config) -> Self {
        Self {
            reader,
            dispatcher,
            source: config.source.clone(),
            rule: MatchRule::from_config(&config.rule),
            seen: Deduplicator::new(),
            backoff: BackoffPolicy::from_config(&config.watch),
            drift: DriftDetector::with_config(DriftConfig {
                threshold: config.watch.ambiguity_threshold,
            }),
            counters: FailureCounters::default(),
            failure_alert_threshold: config.watch.failure_alert_threshold,
            failure_alerted: false,
            interval: config.watch.interval(),
            shutdown_grace: config.watch.shutdown_grace(),
            signal: None,
            state: WatchState::Idle,
        }
    }

    /// Sleep until the keeper signals instead of on a local timer.
    pub fn with_signal(mut self, signal: Arc<Notify>) -> Self {
        self.signal = Some(signal);
        self
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    pub fn counters(&self) -> FailureCounters {
        self.counters
    }

    pub fn seen(&self) -> &Deduplicator {
        &self.seen
    }

    /// Run one full check and summarise it.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.state = WatchState::Fetching;
        let extraction = match self.reader.fetch(&self.source).await {
            Ok(extraction) => extraction,
            Err(e) => return self.on_fetch_error(e).await,
        };
        let items = extraction.items;

        let mut outcome = CycleOutcome::new(CycleStatus::Ok);
        outcome.items_found = items.len();
        outcome.strategy = extraction.strategy;
        self.check_drift(items.len()).await;

        self.state = WatchState::Filtering;
        let matched: Vec<Item> = items.into_iter().filter(|i| self.rule.matches(i)).collect();
        outcome.items_matched = matched.len();
        for item in &matched {
            if let Some(seen_at) = self.seen.first_seen(&item.source_id) {
                log::debug!("Already alerted '{}' (first seen {})", item.title, seen_at.to_rfc3339());
            }
        }
        let fresh = self.seen.filter_new(matched);

        self.state = WatchState::Notifying;
        for item in &fresh {
            log::info!("New delisting: {} ({})", item.title, item.link);
            match self.dispatcher.deliver(&Alert::delisting(item)).await {
                Ok(()) => outcome.items_notified += 1,
                Err(e) => {
                    log::error!("Could not deliver alert for '{}': {}", item.title, e);
                    outcome.items_failed += 1;
                }
            }
        }
        if outcome.items_failed > 0 {
            outcome.status = CycleStatus::NotifyError;
            self.dispatcher
                .announce(&Alert::Warning(format!(
                    "{} delisting alert(s) could not be delivered",
                    outcome.items_failed
                )))
                .await;
        }

        self.end_failure_streak().await;
        self.state = WatchState::Sleeping;
        outcome
    }

    async fn on_fetch_error(&mut self, error: FetchError) -> CycleOutcome {
        self.counters.record(error.kind);
        let streak = self.counters.total();
        let delay = self.backoff.delay_for(streak, &error);
        log::warn!(
            "Fetch failed ({} in a row): {}. Retrying in {}s",
            streak,
            error,
            delay.as_secs()
        );

        if streak >= self.failure_alert_threshold.max(1) && !self.failure_alerted {
            self.failure_alerted = true;
            self.dispatcher
                .announce(&Alert::Warning(format!(
                    "{streak} consecutive fetch failures, last: {error}"
                )))
                .await;
        }

        self.state = WatchState::Backoff(delay);
        CycleOutcome::new(match error.kind {
            FetchErrorKind::Parse => CycleStatus::ParseError,
            FetchErrorKind::Network | FetchErrorKind::UpstreamStatus => CycleStatus::SourceError,
        })
    }

    async fn check_drift(&mut self, item_count: usize) {
        if let DriftStatus::Triggered { consecutive } = self.drift.record(item_count) {
            self.dispatcher
                .announce(&Alert::Warning(format!(
                    "No announcements extracted for {consecutive} consecutive checks. \
                     The source layout may have changed."
                )))
                .await;
        }
    }

    async fn end_failure_streak(&mut self) {
        if self.counters.total() > 0 {
            log::info!("Fetching recovered after {} failure(s)", self.counters.total());
        }
        self.counters = FailureCounters::default();
        if self.failure_alerted {
            self.failure_alerted = false;
            self.dispatcher
                .announce(&Alert::Status("Fetching recovered".to_string()))
                .await;
        }
    }

    /// Time until the next cycle when running on the local timer.
    fn next_delay(&self) -> Duration {
        match self.state {
            WatchState::Backoff(delay) => delay,
            _ => self.interval,
        }
    }

    /// Wait for the next cycle. Returns `false` on shutdown.
    async fn wait(&self, shutdown: &CancellationToken) -> bool {
        match (&self.signal, self.state) {
            (Some(signal), WatchState::Sleeping) => {
                tokio::select! {
                    _ = shutdown.cancelled() => false,
                    _ = signal.notified() => true,
                }
            }
            _ => {
                tokio::select! {
                    _ = shutdown.cancelled() => false,
                    _ = tokio::time::sleep(self.next_delay()) => true,
                }
            }
        }
    }

    /// Run until `shutdown` is cancelled. The first cycle starts immediately.
    pub async fn run(&mut self, shutdown: CancellationToken) {
        log::info!(
            "Watching {} for titles starting with '{}'",
            self.source.url,
            self.rule.prefix()
        );
        self.dispatcher
            .announce(&Alert::Status("Delisting monitor started".to_string()))
            .await;

        loop {
            let grace = self.shutdown_grace;
            let finished = {
                let cycle = self.run_cycle();
                tokio::pin!(cycle);
                tokio::select! {
                    outcome = &mut cycle => Some(outcome),
                    _ = shutdown.cancelled() => {
                        log::info!("Shutdown requested, waiting up to {}s for the current check", grace.as_secs());
                        tokio::time::timeout(grace, &mut cycle).await.ok()
                    }
                }
            };

            match finished {
                Some(outcome) => log_outcome(&outcome),
                None => {
                    log::warn!("Abandoned in-flight check at shutdown");
                    break;
                }
            }

            if shutdown.is_cancelled() || !self.wait(&shutdown).await {
                break;
            }
        }

        self.state = WatchState::Idle;
        self.dispatcher
            .announce(&Alert::Error("Delisting monitor stopped".to_string()))
            .await;
        log::info!("Watch loop stopped ({} announcement(s) seen)", self.seen.len());
    }
}

/// One summary line per cycle.
pub fn log_outcome(outcome: &CycleOutcome) {
    let line = format!(
        "Check {:?}: found {} via {}, matched {}, notified {}, failed {}",
        outcome.status,
        outcome.items_found,
        outcome.strategy.as_deref().unwrap_or("no strategy"),
        outcome.items_matched,
        outcome.items_notified,
        outcome.items_failed
    );
    match outcome.status {
        CycleStatus::Ok => log::info!("{}", line),
        _ => log::warn!("{}", line),
    }
}
