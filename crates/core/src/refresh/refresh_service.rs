//! Refresh loop.
//!
//! Single background loop that keeps the store in sync with the terminal.
//!
//! # Architecture
//!
//! ```text
//! RefreshLoop
//!       │
//!       ├─► TerminalClient (owned session: quotes, history, positions, account)
//!       ├─► WatchlistRepository (symbols to refresh)
//!       ├─► PriceRepository (one transactional replace per cycle)
//!       ├─► CacheRepository (account / portfolio rows)
//!       └─► StatusReporter (health signal)
//! ```
//!
//! # States
//!
//! ```text
//! Disconnected ──► Connecting ──► Syncing ──► Idle ──► Syncing ...
//!       ▲              │             │
//!       └──────────────┴─────────────┘  (connect failure / session lost)
//!
//! any ──► Terminating  (shutdown)
//! ```
//!
//! # Per-symbol policy
//!
//! `fetch_quote` → on `Unavailable`, `fetch_historical_close` → on error,
//! the previous snapshot is carried with source `stale`. A session fault
//! stops further requests; the remaining symbols go stale.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use ibdash_terminal::{Quote, TerminalClient, TerminalError};
use log::{debug, error, info, warn};
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};

use super::reconnect::ReconnectBackoff;
use super::shutdown_requested;
use super::refresh_model::{CycleOutcome, CycleReport, RefreshConfig, RefreshStores};
use crate::cache::CacheKind;
use crate::errors::Result;
use crate::prices::{PriceSnapshot, PriceSource};
use crate::status::{RefreshState, StatusReporter};
use crate::watchlist::WatchlistEntry;

/// Result of the fetch path for one symbol.
enum SymbolFetch {
    Fresh(Quote, PriceSource),
    Failed(TerminalError),
    /// Not requested because the session was lost earlier in the cycle.
    Skipped,
}

pub struct RefreshLoop {
    config: RefreshConfig,
    terminal: Box<dyn TerminalClient>,
    stores: RefreshStores,
    status: Arc<StatusReporter>,
    backoff: ReconnectBackoff,
    state: RefreshState,
    next_cycle_id: i64,
}

impl RefreshLoop {
    /// Creates a loop around a fresh, unconnected terminal client.
    ///
    /// Cycle ids continue after the highest id found in the store or in the
    /// current status, so ids stay monotonic across restarts.
    pub fn new(
        config: RefreshConfig,
        terminal: Box<dyn TerminalClient>,
        stores: RefreshStores,
        status: Arc<StatusReporter>,
    ) -> Result<Self> {
        let stored = stores.prices.latest_cycle_id()?.unwrap_or(0);
        let reported = status.snapshot().last_cycle_id.unwrap_or(0);
        let backoff = ReconnectBackoff::new(config.interval, config.max_reconnect_backoff);

        Ok(Self {
            config,
            terminal,
            stores,
            status,
            backoff,
            state: RefreshState::Disconnected,
            next_cycle_id: stored.max(reported) + 1,
        })
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    async fn set_state(&mut self, state: RefreshState) {
        if self.state == state {
            return;
        }
        debug!("Refresh loop: {} -> {}", self.state, state);
        self.state = state;
        self.status.update(|s| s.state = state).await;
    }

    /// Runs cycles every `interval` until `shutdown` turns true or its
    /// sender is dropped. A slow cycle delays the next one; missed ticks
    /// are not replayed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            "Refresh loop started (every {:?}, terminal {})",
            self.config.interval, self.config.endpoint
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let stopping = *shutdown.borrow();
            if stopping {
                break;
            }
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                tick = ticker.tick() => {
                    self.run_cycle(tick).await;
                }
            }
        }

        self.terminate().await;
        Ok(())
    }

    /// Stops the loop: marks the status and closes the session.
    pub async fn terminate(&mut self) {
        info!("Refresh loop terminating");
        self.set_state(RefreshState::Terminating).await;
        self.terminal.disconnect().await;
        self.status.update(|s| s.connected = false).await;
    }

    /// Executes one cycle. `now` is the scheduled tick time and gates
    /// reconnect attempts.
    pub async fn run_cycle(&mut self, now: Instant) -> CycleReport {
        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;
        let started_at = Utc::now();
        self.status
            .update(|s| s.last_attempt_at = Some(started_at))
            .await;

        if !self.terminal.is_connected() {
            if let Some(report) = self.ensure_connected(cycle_id, now).await {
                return report;
            }
        }

        self.set_state(RefreshState::Syncing).await;

        let entries = match self.stores.watchlist.load_entries() {
            Ok(entries) => entries,
            Err(e) => {
                error!("Cycle {}: failed to read watchlist: {}", cycle_id, e);
                self.finish(cycle_id, false, Some(e.to_string())).await;
                return CycleReport::new(cycle_id, CycleOutcome::WatchlistUnavailable);
            }
        };

        let mut report = CycleReport::new(cycle_id, CycleOutcome::Completed);
        let mut last_error: Option<String> = None;

        match self.stores.prices.load_snapshots() {
            Ok(rows) => {
                let previous: HashMap<String, PriceSnapshot> =
                    rows.into_iter().map(|s| (s.symbol.clone(), s)).collect();
                self.refresh_prices(cycle_id, &entries, &previous, &mut report, &mut last_error)
                    .await;
            }
            Err(e) => {
                // Failed symbols could not be carried as stale, so the
                // price write is dropped and the stored rows stay as they are.
                error!(
                    "Cycle {}: failed to read previous prices, price write dropped: {}",
                    cycle_id, e
                );
                last_error = Some(e.to_string());
            }
        }

        if report.connection_lost {
            warn!(
                "Cycle {}: terminal session lost, remaining requests skipped",
                cycle_id
            );
            self.terminal.disconnect().await;
            self.mark_caches_stale().await;
        } else {
            let lost = self.refresh_caches(&mut report, &mut last_error).await;
            if lost {
                report.connection_lost = true;
                self.terminal.disconnect().await;
            }
        }

        info!(
            "Cycle {} done: {} live, {} historical, {} stale, {} missing",
            cycle_id, report.live, report.historical, report.stale, report.missing
        );

        let success = report.is_success();
        self.finish(cycle_id, success, if success { None } else { last_error })
            .await;
        report
    }

    /// Attempts to connect if the backoff allows it. Returns a report when
    /// the cycle must end here.
    async fn ensure_connected(&mut self, cycle_id: i64, now: Instant) -> Option<CycleReport> {
        if self.state != RefreshState::Disconnected {
            self.set_state(RefreshState::Disconnected).await;
            self.status.update(|s| s.connected = false).await;
        }

        if !self.backoff.is_allowed(now) {
            debug!("Cycle {}: waiting for reconnect backoff", cycle_id);
            return Some(CycleReport::new(cycle_id, CycleOutcome::WaitingToReconnect));
        }

        self.set_state(RefreshState::Connecting).await;
        match self.terminal.connect(&self.config.endpoint).await {
            Ok(()) => {
                self.backoff.record_success();
                self.status
                    .update(|s| {
                        s.connected = true;
                        s.consecutive_connect_failures = 0;
                    })
                    .await;
                None
            }
            Err(e) => {
                let delay = self.backoff.record_failure(now);
                let failures = self.backoff.failures();
                warn!(
                    "Cycle {}: connection failed ({} in a row), retrying in {:?}: {}",
                    cycle_id, failures, delay, e
                );
                self.state = RefreshState::Disconnected;
                let message = e.to_string();
                self.status
                    .update(|s| {
                        s.state = RefreshState::Disconnected;
                        s.connected = false;
                        s.consecutive_connect_failures = failures;
                        s.last_error = Some(message);
                    })
                    .await;
                Some(CycleReport::new(cycle_id, CycleOutcome::ConnectFailed))
            }
        }
    }

    /// Fetches every symbol and replaces the price table in one write.
    async fn refresh_prices(
        &self,
        cycle_id: i64,
        entries: &[WatchlistEntry],
        previous: &HashMap<String, PriceSnapshot>,
        report: &mut CycleReport,
        last_error: &mut Option<String>,
    ) {
        let fetches = self.fetch_symbols(entries).await;
        let mut snapshots = Vec::with_capacity(entries.len());
        for (entry, fetch) in entries.iter().zip(fetches) {
            match fetch {
                SymbolFetch::Fresh(quote, source) => {
                    match source {
                        PriceSource::Live => report.live += 1,
                        _ => report.historical += 1,
                    }
                    snapshots.push(PriceSnapshot::from_quote(&quote, source, cycle_id));
                }
                failed => {
                    if let SymbolFetch::Failed(e) = &failed {
                        if e.is_connection_fault() {
                            report.connection_lost = true;
                        }
                        last_error.get_or_insert_with(|| format!("{}: {}", entry.symbol, e));
                    }
                    match previous.get(&entry.symbol) {
                        Some(prior) => {
                            report.stale += 1;
                            snapshots.push(prior.to_stale(cycle_id));
                        }
                        None => report.missing += 1,
                    }
                }
            }
        }

        match self.stores.prices.replace_snapshots(snapshots).await {
            Ok(summary) => {
                debug!(
                    "Cycle {}: wrote {} price rows ({} skipped, {} purged)",
                    cycle_id, summary.written, summary.skipped, summary.purged
                );
                report.price_write = Some(summary);
            }
            Err(e) => {
                error!("Cycle {}: price write dropped: {}", cycle_id, e);
                *last_error = Some(e.to_string());
            }
        }
    }

    async fn fetch_symbols(&self, entries: &[WatchlistEntry]) -> Vec<SymbolFetch> {
        let terminal: &dyn TerminalClient = self.terminal.as_ref();
        let session_lost = AtomicBool::new(false);
        let session_lost = &session_lost;
        let limit = self.config.max_concurrent_requests.max(1);
        let symbols: Vec<String> = entries.iter().map(|e| e.symbol.clone()).collect();

        stream::iter(symbols)
            .map(move |symbol: String| async move {
                if session_lost.load(Ordering::Acquire) {
                    return SymbolFetch::Skipped;
                }
                let fetch = fetch_symbol(terminal, &symbol).await;
                if let SymbolFetch::Failed(e) = &fetch {
                    if e.is_connection_fault() {
                        session_lost.store(true, Ordering::Release);
                    }
                }
                fetch
            })
            .buffered(limit)
            .collect()
            .await
    }

    /// Refreshes both caches. Returns true when the session was lost.
    async fn refresh_caches(
        &self,
        report: &mut CycleReport,
        last_error: &mut Option<String>,
    ) -> bool {
        match self.terminal.fetch_positions().await {
            Ok(positions) => {
                report.portfolio_refreshed = self
                    .store_cache(CacheKind::Portfolio, serde_json::to_value(&positions))
                    .await;
            }
            Err(e) => {
                warn!("Positions request failed: {}", e);
                last_error.get_or_insert_with(|| format!("positions: {}", e));
                self.mark_stale(CacheKind::Portfolio).await;
                if e.is_connection_fault() {
                    self.mark_stale(CacheKind::Account).await;
                    return true;
                }
            }
        }

        match self.terminal.fetch_account_summary().await {
            Ok(info) => {
                report.account_refreshed = self
                    .store_cache(CacheKind::Account, serde_json::to_value(&info))
                    .await;
            }
            Err(e) => {
                warn!("Account summary request failed: {}", e);
                last_error.get_or_insert_with(|| format!("account summary: {}", e));
                self.mark_stale(CacheKind::Account).await;
                return e.is_connection_fault();
            }
        }
        false
    }

    async fn store_cache(
        &self,
        kind: CacheKind,
        payload: serde_json::Result<serde_json::Value>,
    ) -> bool {
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to encode {} payload: {}", kind, e);
                self.mark_stale(kind).await;
                return false;
            }
        };
        match self.stores.caches.put_cache(kind, payload, Utc::now()).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to write {} cache: {}", kind, e);
                false
            }
        }
    }

    async fn mark_stale(&self, kind: CacheKind) {
        if let Err(e) = self.stores.caches.mark_cache_stale(kind).await {
            error!("Failed to flag {} cache as stale: {}", kind, e);
        }
    }

    async fn mark_caches_stale(&self) {
        self.mark_stale(CacheKind::Portfolio).await;
        self.mark_stale(CacheKind::Account).await;
    }

    async fn finish(&mut self, cycle_id: i64, success: bool, last_error: Option<String>) {
        let connected = self.terminal.is_connected();
        self.state = if connected {
            RefreshState::Idle
        } else {
            RefreshState::Disconnected
        };
        let state = self.state;
        let finished_at = Utc::now();

        self.status
            .update(|s| {
                s.state = state;
                s.connected = connected;
                s.last_cycle_id = Some(cycle_id);
                if success {
                    s.last_successful_cycle_at = Some(finished_at);
                }
                s.last_error = last_error;
            })
            .await;
    }
}

async fn fetch_symbol(terminal: &dyn TerminalClient, symbol: &str) -> SymbolFetch {
    match terminal.fetch_quote(symbol).await {
        Ok(outcome) => match outcome.into_quote() {
            Some(quote) => return SymbolFetch::Fresh(quote, PriceSource::Live),
            None => debug!("No live quote for {}, using historical close", symbol),
        },
        Err(e) => {
            warn!("Quote request for {} failed: {}", symbol, e);
            return SymbolFetch::Failed(e);
        }
    }

    match terminal.fetch_historical_close(symbol).await {
        Ok(quote) => SymbolFetch::Fresh(quote, PriceSource::Historical),
        Err(e) => {
            warn!("Historical request for {} failed: {}", symbol, e);
            SymbolFetch::Failed(e)
        }
    }
}
