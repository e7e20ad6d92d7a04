//! Refresh loop configuration and per-cycle report.

use std::sync::Arc;
use std::time::Duration;

use ibdash_terminal::TerminalEndpoint;
use serde::Serialize;

use crate::cache::CacheRepositoryTrait;
use crate::constants::{
    DEFAULT_DATA_CLIENT_ID, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_RECONNECT_BACKOFF,
    DEFAULT_REFRESH_INTERVAL, DEFAULT_TERMINAL_HOST, DEFAULT_TERMINAL_PORT,
};
use crate::prices::{PriceRepositoryTrait, PriceWriteSummary};
use crate::watchlist::WatchlistRepositoryTrait;

/// Settings of one refresh loop.
#[derive(Clone, Debug)]
pub struct RefreshConfig {
    pub endpoint: TerminalEndpoint,
    /// Time between cycle starts.
    pub interval: Duration,
    /// Cap of the reconnect backoff.
    pub max_reconnect_backoff: Duration,
    /// Symbol requests in flight at once.
    pub max_concurrent_requests: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            endpoint: TerminalEndpoint::new(
                DEFAULT_TERMINAL_HOST,
                DEFAULT_TERMINAL_PORT,
                DEFAULT_DATA_CLIENT_ID,
            ),
            interval: DEFAULT_REFRESH_INTERVAL,
            max_reconnect_backoff: DEFAULT_MAX_RECONNECT_BACKOFF,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

/// Repositories the refresh loop reads and writes.
#[derive(Clone)]
pub struct RefreshStores {
    pub watchlist: Arc<dyn WatchlistRepositoryTrait>,
    pub prices: Arc<dyn PriceRepositoryTrait>,
    pub caches: Arc<dyn CacheRepositoryTrait>,
}

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleOutcome {
    /// Prices were fetched and the write was attempted.
    Completed,
    /// Not connected and the backoff did not allow an attempt yet.
    WaitingToReconnect,
    /// The connection attempt failed.
    ConnectFailed,
    /// The watchlist could not be read.
    WatchlistUnavailable,
}

/// Summary of one cycle, used for logging and tests.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle_id: i64,
    pub outcome: CycleOutcome,
    pub live: usize,
    pub historical: usize,
    pub stale: usize,
    /// Symbols with neither fresh data nor a previous snapshot.
    pub missing: usize,
    /// `None` when the price write failed or was not attempted.
    pub price_write: Option<PriceWriteSummary>,
    pub portfolio_refreshed: bool,
    pub account_refreshed: bool,
    pub connection_lost: bool,
}

impl CycleReport {
    pub(crate) fn new(cycle_id: i64, outcome: CycleOutcome) -> Self {
        Self {
            cycle_id,
            outcome,
            live: 0,
            historical: 0,
            stale: 0,
            missing: 0,
            price_write: None,
            portfolio_refreshed: false,
            account_refreshed: false,
            connection_lost: false,
        }
    }

    /// Prices committed and the session survived the cycle.
    pub fn is_success(&self) -> bool {
        self.outcome == CycleOutcome::Completed
            && self.price_write.is_some()
            && !self.connection_lost
    }
}
