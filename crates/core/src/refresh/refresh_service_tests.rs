#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::{BTreeMap, HashMap, VecDeque};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::watch;
    use tokio::time::Instant;

    use ibdash_terminal::{
        AccountInfo, Position, Quote, QuoteOutcome, TerminalClient, TerminalEndpoint,
        TerminalError,
    };

    use crate::cache::{CacheKind, CacheRepositoryTrait, CachedPayload};
    use crate::errors::{DatabaseError, Error, Result};
    use crate::prices::{PriceRepositoryTrait, PriceSnapshot, PriceSource, PriceWriteSummary};
    use crate::refresh::{
        CycleOutcome, RefreshConfig, RefreshLoop, RefreshStores, RefreshSupervisor,
        SupervisorConfig, TerminalFactory,
    };
    use crate::status::{RefreshState, RefreshStatus, StatusReporter, StatusRepositoryTrait};
    use crate::watchlist::{NewWatchlistEntry, WatchlistEntry, WatchlistItem, WatchlistRepositoryTrait};

    // --- Terminal mock ---

    #[derive(Default)]
    struct TerminalScript {
        connect_results: VecDeque<std::result::Result<(), TerminalError>>,
        quotes: HashMap<String, std::result::Result<QuoteOutcome, TerminalError>>,
        history: HashMap<String, std::result::Result<Quote, TerminalError>>,
        positions: Option<std::result::Result<Vec<Position>, TerminalError>>,
        account: Option<std::result::Result<AccountInfo, TerminalError>>,
        /// (trigger symbol, symbol removed from the store when the trigger is quoted)
        remove_on_quote: Option<(String, String, MemoryStore)>,
        calls: Vec<String>,
        connect_attempts: usize,
        hang_on_quote: bool,
        panic_on_connect: bool,
    }

    #[derive(Clone, Default)]
    struct MockTerminal {
        script: Arc<Mutex<TerminalScript>>,
        connected: Arc<AtomicBool>,
    }

    impl MockTerminal {
        fn with_quote(self, symbol: &str, outcome: std::result::Result<QuoteOutcome, TerminalError>) -> Self {
            self.script
                .lock()
                .unwrap()
                .quotes
                .insert(symbol.to_string(), outcome);
            self
        }

        fn with_history(self, symbol: &str, result: std::result::Result<Quote, TerminalError>) -> Self {
            self.script
                .lock()
                .unwrap()
                .history
                .insert(symbol.to_string(), result);
            self
        }

        fn set_positions(&self, result: std::result::Result<Vec<Position>, TerminalError>) {
            self.script.lock().unwrap().positions = Some(result);
        }

        fn calls(&self) -> Vec<String> {
            self.script.lock().unwrap().calls.clone()
        }

        fn connect_attempts(&self) -> usize {
            self.script.lock().unwrap().connect_attempts
        }
    }

    #[async_trait]
    impl TerminalClient for MockTerminal {
        async fn connect(&mut self, endpoint: &TerminalEndpoint) -> std::result::Result<(), TerminalError> {
            let result = {
                let mut script = self.script.lock().unwrap();
                script.connect_attempts += 1;
                if script.panic_on_connect {
                    drop(script);
                    panic!("Intentional panic while connecting to {}", endpoint);
                }
                script.connect_results.pop_front().unwrap_or(Ok(()))
            };
            self.connected.store(result.is_ok(), Ordering::SeqCst);
            result
        }

        fn is_connected(&self) -> bool {
            self.connected.load(Ordering::SeqCst)
        }

        async fn disconnect(&mut self) {
            self.connected.store(false, Ordering::SeqCst);
        }

        async fn fetch_positions(&self) -> std::result::Result<Vec<Position>, TerminalError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push("positions".to_string());
            script.positions.clone().unwrap_or_else(|| Ok(vec![]))
        }

        async fn fetch_quote(&self, symbol: &str) -> std::result::Result<QuoteOutcome, TerminalError> {
            let (result, hang) = {
                let mut script = self.script.lock().unwrap();
                script.calls.push(format!("quote:{}", symbol));
                if let Some((trigger, removed, store)) = &script.remove_on_quote {
                    if trigger == symbol {
                        store.remove_now(removed);
                    }
                }
                let result = script
                    .quotes
                    .get(symbol)
                    .cloned()
                    .unwrap_or(Ok(QuoteOutcome::Unavailable));
                (result, script.hang_on_quote)
            };
            if hang {
                std::future::pending::<()>().await;
            }
            if matches!(&result, Err(e) if e.is_connection_fault()) {
                self.connected.store(false, Ordering::SeqCst);
            }
            result
        }

        async fn fetch_historical_close(&self, symbol: &str) -> std::result::Result<Quote, TerminalError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push(format!("history:{}", symbol));
            script
                .history
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| Err(TerminalError::NoHistoricalData(symbol.to_string())))
        }

        async fn fetch_account_summary(&self) -> std::result::Result<AccountInfo, TerminalError> {
            let mut script = self.script.lock().unwrap();
            script.calls.push("account".to_string());
            script.account.clone().unwrap_or_else(|| {
                let mut info = AccountInfo::default();
                info.managed_accounts.push("DU123".to_string());
                info.insert("DU123", "NetLiquidation", "100000", "USD");
                Ok(info)
            })
        }
    }

    // --- In-memory store ---

    #[derive(Clone, Default)]
    struct MemoryStore {
        watchlist: Arc<Mutex<BTreeMap<String, WatchlistEntry>>>,
        prices: Arc<Mutex<BTreeMap<String, PriceSnapshot>>>,
        caches: Arc<Mutex<HashMap<CacheKind, CachedPayload>>>,
        status: Arc<Mutex<Option<RefreshStatus>>>,
        fail_price_write: Arc<AtomicBool>,
        fail_price_read: Arc<AtomicBool>,
        fail_watchlist_read: Arc<AtomicBool>,
    }

    impl MemoryStore {
        fn with_symbols(symbols: &[&str]) -> Self {
            let store = Self::default();
            for symbol in symbols {
                store.watchlist.lock().unwrap().insert(
                    symbol.to_string(),
                    WatchlistEntry {
                        symbol: symbol.to_string(),
                        name: symbol.to_string(),
                        added_at: Utc::now(),
                    },
                );
            }
            store
        }

        fn seed_price(&self, symbol: &str, price: f64, cycle_id: i64) {
            self.prices.lock().unwrap().insert(
                symbol.to_string(),
                PriceSnapshot {
                    symbol: symbol.to_string(),
                    price,
                    change: 1.0,
                    change_pct: 0.5,
                    volume: 500,
                    bid: None,
                    ask: None,
                    close_price: Some(price - 1.0),
                    source: PriceSource::Live,
                    observed_at: observed_earlier(),
                    cycle_id,
                },
            );
        }

        fn remove_now(&self, symbol: &str) {
            self.watchlist.lock().unwrap().remove(symbol);
            self.prices.lock().unwrap().remove(symbol);
        }

        fn price(&self, symbol: &str) -> Option<PriceSnapshot> {
            self.prices.lock().unwrap().get(symbol).cloned()
        }

        fn cache(&self, kind: CacheKind) -> Option<CachedPayload> {
            self.caches.lock().unwrap().get(&kind).cloned()
        }

        fn stores(&self) -> RefreshStores {
            RefreshStores {
                watchlist: Arc::new(self.clone()),
                prices: Arc::new(self.clone()),
                caches: Arc::new(self.clone()),
            }
        }
    }

    #[async_trait]
    impl WatchlistRepositoryTrait for MemoryStore {
        fn load_entries(&self) -> Result<Vec<WatchlistEntry>> {
            if self.fail_watchlist_read.load(Ordering::SeqCst) {
                return Err(Error::Database(DatabaseError::QueryFailed(
                    "Intentional read failure".into(),
                )));
            }
            Ok(self.watchlist.lock().unwrap().values().cloned().collect())
        }

        fn get_entry(&self, symbol: &str) -> Result<Option<WatchlistEntry>> {
            Ok(self.watchlist.lock().unwrap().get(symbol).cloned())
        }

        fn load_with_latest_prices(&self) -> Result<Vec<WatchlistItem>> {
            unimplemented!()
        }

        async fn insert_entry(&self, _entry: NewWatchlistEntry) -> Result<bool> {
            unimplemented!()
        }

        async fn delete_entries(&self, symbols: Vec<String>) -> Result<usize> {
            let mut removed = 0;
            for symbol in symbols {
                if self.watchlist.lock().unwrap().remove(&symbol).is_some() {
                    removed += 1;
                }
                self.prices.lock().unwrap().remove(&symbol);
            }
            Ok(removed)
        }
    }

    #[async_trait]
    impl PriceRepositoryTrait for MemoryStore {
        fn load_snapshots(&self) -> Result<Vec<PriceSnapshot>> {
            if self.fail_price_read.load(Ordering::SeqCst) {
                return Err(Error::Database(DatabaseError::QueryFailed(
                    "Intentional read failure".into(),
                )));
            }
            Ok(self.prices.lock().unwrap().values().cloned().collect())
        }

        fn get_snapshot(&self, symbol: &str) -> Result<Option<PriceSnapshot>> {
            Ok(self.price(symbol))
        }

        fn latest_cycle_id(&self) -> Result<Option<i64>> {
            Ok(self.prices.lock().unwrap().values().map(|s| s.cycle_id).max())
        }

        async fn replace_snapshots(&self, snapshots: Vec<PriceSnapshot>) -> Result<PriceWriteSummary> {
            if self.fail_price_write.load(Ordering::SeqCst) {
                return Err(Error::Database(DatabaseError::TransactionFailed(
                    "Intentional write failure".into(),
                )));
            }
            let watchlist = self.watchlist.lock().unwrap();
            let mut prices = self.prices.lock().unwrap();
            let mut summary = PriceWriteSummary::default();

            let before = prices.len();
            prices.retain(|symbol, _| watchlist.contains_key(symbol));
            summary.purged = before - prices.len();

            for snapshot in snapshots {
                if watchlist.contains_key(&snapshot.symbol) {
                    prices.insert(snapshot.symbol.clone(), snapshot);
                    summary.written += 1;
                } else {
                    summary.skipped += 1;
                }
            }
            Ok(summary)
        }
    }

    #[async_trait]
    impl CacheRepositoryTrait for MemoryStore {
        fn get_cache(&self, kind: CacheKind) -> Result<Option<CachedPayload>> {
            Ok(self.cache(kind))
        }

        async fn put_cache(
            &self,
            kind: CacheKind,
            payload: serde_json::Value,
            fetched_at: DateTime<Utc>,
        ) -> Result<()> {
            self.caches.lock().unwrap().insert(
                kind,
                CachedPayload {
                    kind,
                    payload,
                    fetched_at,
                    is_stale: false,
                },
            );
            Ok(())
        }

        async fn mark_cache_stale(&self, kind: CacheKind) -> Result<bool> {
            Ok(match self.caches.lock().unwrap().get_mut(&kind) {
                Some(row) => {
                    row.is_stale = true;
                    true
                }
                None => false,
            })
        }
    }

    #[async_trait]
    impl StatusRepositoryTrait for MemoryStore {
        fn load_status(&self) -> Result<Option<RefreshStatus>> {
            Ok(self.status.lock().unwrap().clone())
        }

        async fn save_status(&self, status: RefreshStatus) -> Result<()> {
            *self.status.lock().unwrap() = Some(status);
            Ok(())
        }
    }

    // --- Helpers ---

    fn observed_earlier() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap()
    }

    fn live(symbol: &str, price: f64, previous_close: f64) -> std::result::Result<QuoteOutcome, TerminalError> {
        Ok(QuoteOutcome::Available(
            Quote::new(symbol, price, Utc::now())
                .with_previous_close(previous_close)
                .with_volume(1_000),
        ))
    }

    fn test_config() -> RefreshConfig {
        RefreshConfig {
            interval: Duration::from_secs(5),
            max_reconnect_backoff: Duration::from_secs(60),
            max_concurrent_requests: 4,
            ..RefreshConfig::default()
        }
    }

    fn build_loop(
        store: &MemoryStore,
        terminal: &MockTerminal,
        config: RefreshConfig,
    ) -> (RefreshLoop, Arc<StatusReporter>) {
        let status = Arc::new(StatusReporter::new(Arc::new(store.clone())));
        let refresh_loop =
            RefreshLoop::new(config, Box::new(terminal.clone()), store.stores(), status.clone())
                .unwrap();
        (refresh_loop, status)
    }

    // --- Cycle tests ---

    #[tokio::test]
    async fn test_cycle_writes_live_and_historical_prices() {
        let store = MemoryStore::with_symbols(&["AAPL", "MSFT"]);
        let terminal = MockTerminal::default()
            .with_quote(
                "AAPL",
                Ok(QuoteOutcome::Available(
                    Quote::new("AAPL", 150.0, Utc::now())
                        .with_previous_close(148.22)
                        .with_volume(1_000_000),
                )),
            )
            .with_quote("MSFT", Ok(QuoteOutcome::Unavailable))
            .with_history(
                "MSFT",
                Ok(Quote::new("MSFT", 310.0, Utc::now()).with_previous_close(310.0)),
            );
        let (mut refresh_loop, status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.cycle_id, 1);
        assert_eq!((report.live, report.historical, report.stale), (1, 1, 0));
        assert!(report.is_success());

        let aapl = store.price("AAPL").unwrap();
        assert_eq!(aapl.source, PriceSource::Live);
        assert_eq!(aapl.price, 150.0);
        assert_eq!(aapl.change_pct, 1.2);
        assert_eq!(aapl.volume, 1_000_000);

        let msft = store.price("MSFT").unwrap();
        assert_eq!(msft.source, PriceSource::Historical);
        assert_eq!(msft.price, 310.0);
        assert_eq!(msft.change, 0.0);
        assert_eq!(msft.change_pct, 0.0);

        assert!(terminal.calls().contains(&"history:MSFT".to_string()));
        assert!(!terminal.calls().contains(&"history:AAPL".to_string()));

        let current = status.snapshot();
        assert_eq!(current.state, RefreshState::Idle);
        assert!(current.connected);
        assert_eq!(current.last_cycle_id, Some(1));
        assert!(current.last_successful_cycle_at.is_some());
        assert_eq!(store.load_status().unwrap(), Some(current));

        let portfolio = store.cache(CacheKind::Portfolio).unwrap();
        assert!(!portfolio.is_stale);
        let account = store.cache(CacheKind::Account).unwrap();
        assert_eq!(account.payload["managedAccounts"][0], "DU123");
    }

    #[tokio::test]
    async fn test_failed_symbol_keeps_previous_values_as_stale() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        store.seed_price("AAPL", 180.0, 7);
        let terminal = MockTerminal::default()
            .with_quote(
                "AAPL",
                Err(TerminalError::Timeout {
                    operation: "quote AAPL".to_string(),
                }),
            );
        let (mut refresh_loop, _status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert_eq!(report.cycle_id, 8);
        assert_eq!(report.stale, 1);
        let aapl = store.price("AAPL").unwrap();
        assert_eq!(aapl.source, PriceSource::Stale);
        assert_eq!(aapl.price, 180.0);
        assert_eq!(aapl.cycle_id, 8);
        assert_eq!(aapl.observed_at, observed_earlier());
    }

    #[tokio::test]
    async fn test_symbol_without_any_price_gets_no_row() {
        let store = MemoryStore::with_symbols(&["NVDA"]);
        let terminal = MockTerminal::default();
        let (mut refresh_loop, _status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert_eq!(report.missing, 1);
        assert!(store.price("NVDA").is_none());
        assert_eq!(
            terminal.calls(),
            vec!["quote:NVDA", "history:NVDA", "positions", "account"]
        );
    }

    #[tokio::test]
    async fn test_cycle_ids_shared_within_cycle_and_increasing() {
        let store = MemoryStore::with_symbols(&["AAPL", "MSFT"]);
        let terminal = MockTerminal::default()
            .with_quote("AAPL", live("AAPL", 190.0, 185.0))
            .with_quote("MSFT", live("MSFT", 410.0, 400.0));
        let (mut refresh_loop, _status) = build_loop(&store, &terminal, test_config());

        let first = refresh_loop.run_cycle(Instant::now()).await;
        assert_eq!(store.price("AAPL").unwrap().cycle_id, first.cycle_id);
        assert_eq!(store.price("MSFT").unwrap().cycle_id, first.cycle_id);

        let second = refresh_loop.run_cycle(Instant::now()).await;
        assert!(second.cycle_id > first.cycle_id);
        assert_eq!(store.price("AAPL").unwrap().cycle_id, second.cycle_id);
        assert_eq!(store.price("MSFT").unwrap().cycle_id, second.cycle_id);
    }

    #[tokio::test]
    async fn test_cycle_ids_continue_after_restart() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        store.seed_price("AAPL", 180.0, 41);
        let terminal = MockTerminal::default().with_quote("AAPL", live("AAPL", 190.0, 185.0));
        let (mut refresh_loop, _status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert_eq!(report.cycle_id, 42);
    }

    #[tokio::test]
    async fn test_symbol_removed_mid_cycle_is_not_resurrected() {
        let store = MemoryStore::with_symbols(&["AAPL", "MSFT"]);
        store.seed_price("MSFT", 400.0, 1);
        let terminal = MockTerminal::default()
            .with_quote("AAPL", live("AAPL", 190.0, 185.0))
            .with_quote("MSFT", live("MSFT", 410.0, 400.0));
        terminal.script.lock().unwrap().remove_on_quote =
            Some(("AAPL".to_string(), "MSFT".to_string(), store.clone()));
        let (mut refresh_loop, _status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        let summary = report.price_write.unwrap();
        assert_eq!(summary.written, 1);
        assert_eq!(summary.skipped, 1);
        assert!(store.price("AAPL").is_some());
        assert!(store.price("MSFT").is_none());
    }

    #[tokio::test]
    async fn test_connection_drop_stops_requests_and_marks_rest_stale() {
        let store = MemoryStore::with_symbols(&["AAPL", "MSFT", "NVDA"]);
        store.seed_price("AAPL", 180.0, 3);
        store.seed_price("MSFT", 400.0, 3);
        store.seed_price("NVDA", 900.0, 3);
        let terminal = MockTerminal::default()
            .with_quote("AAPL", live("AAPL", 190.0, 185.0))
            .with_quote(
                "MSFT",
                Err(TerminalError::ConnectionLost("socket closed".to_string())),
            )
            .with_quote("NVDA", live("NVDA", 950.0, 900.0));
        let config = RefreshConfig {
            max_concurrent_requests: 1,
            ..test_config()
        };
        let (mut refresh_loop, status) = build_loop(&store, &terminal, config);

        // First cycle fills the caches.
        terminal
            .script
            .lock()
            .unwrap()
            .quotes
            .insert("MSFT".to_string(), live("MSFT", 410.0, 400.0));
        refresh_loop.run_cycle(Instant::now()).await;
        terminal.script.lock().unwrap().quotes.insert(
            "MSFT".to_string(),
            Err(TerminalError::ConnectionLost("socket closed".to_string())),
        );
        terminal.script.lock().unwrap().calls.clear();

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert!(report.connection_lost);
        assert!(!report.is_success());
        assert_eq!((report.live, report.stale), (1, 2));
        assert_eq!(terminal.calls(), vec!["quote:AAPL", "quote:MSFT"]);

        assert_eq!(store.price("AAPL").unwrap().source, PriceSource::Live);
        assert_eq!(store.price("MSFT").unwrap().source, PriceSource::Stale);
        assert_eq!(store.price("NVDA").unwrap().source, PriceSource::Stale);
        assert_eq!(store.price("NVDA").unwrap().price, 950.0);

        assert!(store.cache(CacheKind::Portfolio).unwrap().is_stale);
        assert!(store.cache(CacheKind::Account).unwrap().is_stale);

        let current = status.snapshot();
        assert_eq!(current.state, RefreshState::Disconnected);
        assert!(!current.connected);
        assert!(current.last_error.unwrap().contains("MSFT"));
        assert!(!terminal.is_connected());
    }

    #[tokio::test]
    async fn test_connect_failures_back_off() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        let terminal = MockTerminal::default().with_quote("AAPL", live("AAPL", 190.0, 185.0));
        {
            let mut script = terminal.script.lock().unwrap();
            for _ in 0..2 {
                script.connect_results.push_back(Err(TerminalError::ConnectionFailed {
                    endpoint: "127.0.0.1:7498".to_string(),
                    message: "connection refused".to_string(),
                }));
            }
        }
        let (mut refresh_loop, status) = build_loop(&store, &terminal, test_config());
        let start = Instant::now();
        let at = |secs: u64| start + Duration::from_secs(secs);

        assert_eq!(refresh_loop.run_cycle(at(0)).await.outcome, CycleOutcome::ConnectFailed);
        assert_eq!(status.snapshot().consecutive_connect_failures, 1);
        assert_eq!(status.snapshot().state, RefreshState::Disconnected);
        assert!(status.snapshot().last_error.is_some());

        assert_eq!(
            refresh_loop.run_cycle(at(1)).await.outcome,
            CycleOutcome::WaitingToReconnect
        );
        assert_eq!(terminal.connect_attempts(), 1);

        assert_eq!(refresh_loop.run_cycle(at(5)).await.outcome, CycleOutcome::ConnectFailed);
        assert_eq!(status.snapshot().consecutive_connect_failures, 2);

        assert_eq!(
            refresh_loop.run_cycle(at(10)).await.outcome,
            CycleOutcome::WaitingToReconnect
        );
        assert_eq!(terminal.connect_attempts(), 2);

        let report = refresh_loop.run_cycle(at(15)).await;
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(terminal.connect_attempts(), 3);

        let current = status.snapshot();
        assert_eq!(current.consecutive_connect_failures, 0);
        assert!(current.connected);
        assert_eq!(current.state, RefreshState::Idle);
        assert!(store.price("AAPL").is_some());
    }

    #[tokio::test]
    async fn test_cache_failure_keeps_payload_and_flags_stale() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        let terminal = MockTerminal::default().with_quote("AAPL", live("AAPL", 190.0, 185.0));
        terminal.set_positions(Ok(vec![Position {
            account: "DU123".to_string(),
            symbol: "AAPL".to_string(),
            sec_type: "STK".to_string(),
            exchange: "NASDAQ".to_string(),
            currency: "USD".to_string(),
            position: 10.0,
            average_cost: 120.5,
        }]));
        let (mut refresh_loop, _status) = build_loop(&store, &terminal, test_config());

        let first = refresh_loop.run_cycle(Instant::now()).await;
        assert!(first.portfolio_refreshed);
        let fetched = store.cache(CacheKind::Portfolio).unwrap();

        terminal.set_positions(Err(TerminalError::Rejected {
            operation: "positions".to_string(),
            message: "pacing violation".to_string(),
        }));
        let second = refresh_loop.run_cycle(Instant::now()).await;

        assert!(!second.portfolio_refreshed);
        assert!(second.account_refreshed);
        assert!(second.is_success());
        let cached = store.cache(CacheKind::Portfolio).unwrap();
        assert!(cached.is_stale);
        assert_eq!(cached.payload, fetched.payload);
        assert_eq!(cached.fetched_at, fetched.fetched_at);
        assert!(!store.cache(CacheKind::Account).unwrap().is_stale);
    }

    #[tokio::test]
    async fn test_price_write_failure_leaves_previous_rows() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        store.seed_price("AAPL", 180.0, 2);
        store.fail_price_write.store(true, Ordering::SeqCst);
        let terminal = MockTerminal::default().with_quote("AAPL", live("AAPL", 190.0, 185.0));
        let (mut refresh_loop, status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert!(report.price_write.is_none());
        assert!(!report.is_success());
        let aapl = store.price("AAPL").unwrap();
        assert_eq!(aapl.price, 180.0);
        assert_eq!(aapl.cycle_id, 2);

        let current = status.snapshot();
        assert!(current.last_successful_cycle_at.is_none());
        assert!(current.last_error.is_some());
        assert_eq!(current.state, RefreshState::Idle);
    }

    #[tokio::test]
    async fn test_previous_price_read_failure_drops_price_write() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        store.seed_price("AAPL", 180.0, 7);
        store.fail_price_read.store(true, Ordering::SeqCst);
        let terminal = MockTerminal::default();
        let (mut refresh_loop, status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert!(report.price_write.is_none());
        assert!(!report.is_success());
        assert_eq!(report.missing, 0);
        // No symbol was requested and the stored row is untouched.
        assert!(!terminal.calls().iter().any(|c| c.starts_with("quote:")));
        let aapl = store.price("AAPL").unwrap();
        assert_eq!(aapl.price, 180.0);
        assert_eq!(aapl.cycle_id, 7);

        let current = status.snapshot();
        assert!(current.last_successful_cycle_at.is_none());
        assert!(current.last_error.is_some());
    }

    #[tokio::test]
    async fn test_watchlist_read_failure_skips_cycle() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        store.fail_watchlist_read.store(true, Ordering::SeqCst);
        let terminal = MockTerminal::default();
        let (mut refresh_loop, status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert_eq!(report.outcome, CycleOutcome::WatchlistUnavailable);
        assert!(terminal.calls().is_empty());
        assert_eq!(status.snapshot().last_cycle_id, Some(report.cycle_id));
        assert!(status.snapshot().last_successful_cycle_at.is_none());
    }

    #[tokio::test]
    async fn test_empty_watchlist_still_refreshes_caches() {
        let store = MemoryStore::default();
        let terminal = MockTerminal::default();
        let (mut refresh_loop, _status) = build_loop(&store, &terminal, test_config());

        let report = refresh_loop.run_cycle(Instant::now()).await;

        assert!(report.is_success());
        assert_eq!(report.price_write, Some(PriceWriteSummary::default()));
        assert!(store.cache(CacheKind::Portfolio).is_some());
        assert!(store.cache(CacheKind::Account).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        let terminal = MockTerminal::default().with_quote("AAPL", live("AAPL", 190.0, 185.0));
        let (refresh_loop, status) = build_loop(&store, &terminal, test_config());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(refresh_loop.run(rx));
        tokio::time::sleep(Duration::from_secs(11)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        let current = status.snapshot();
        assert_eq!(current.state, RefreshState::Terminating);
        assert!(!current.connected);
        assert!(current.last_cycle_id.unwrap() >= 2);
        assert!(!terminal.is_connected());
    }

    // --- Supervisor tests ---

    fn factory_for(terminal: &MockTerminal, started: Arc<AtomicUsize>) -> TerminalFactory {
        let terminal = terminal.clone();
        Arc::new(move || {
            started.fetch_add(1, Ordering::SeqCst);
            Box::new(terminal.clone()) as Box<dyn TerminalClient>
        })
    }

    fn supervisor_for(
        store: &MemoryStore,
        terminal: &MockTerminal,
        config: SupervisorConfig,
        started: Arc<AtomicUsize>,
    ) -> (RefreshSupervisor, Arc<StatusReporter>) {
        let status = Arc::new(StatusReporter::new(Arc::new(store.clone())));
        let supervisor = RefreshSupervisor::new(
            config,
            test_config(),
            store.stores(),
            status.clone(),
            factory_for(terminal, started),
        );
        (supervisor, status)
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_gives_up_after_max_restarts() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        let terminal = MockTerminal::default();
        terminal.script.lock().unwrap().panic_on_connect = true;
        let started = Arc::new(AtomicUsize::new(0));
        let config = SupervisorConfig {
            max_restarts: 2,
            restart_delay: Duration::from_millis(100),
            shutdown_grace: Duration::from_secs(1),
        };
        let (supervisor, status) = supervisor_for(&store, &terminal, config, started.clone());
        let (_tx, rx) = watch::channel(false);

        let result = supervisor.run(rx).await;

        assert!(matches!(result, Err(Error::RefreshStopped(_))));
        assert_eq!(started.load(Ordering::SeqCst), 3);
        let current = status.snapshot();
        assert_eq!(current.state, RefreshState::Failed);
        assert_eq!(current.restarts, 2);
        assert!(current.last_error.unwrap().contains("panicked"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_graceful_shutdown() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        let terminal = MockTerminal::default().with_quote("AAPL", live("AAPL", 190.0, 185.0));
        let started = Arc::new(AtomicUsize::new(0));
        let (supervisor, status) =
            supervisor_for(&store, &terminal, SupervisorConfig::default(), started.clone());
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(supervisor.run(rx));
        tokio::time::sleep(Duration::from_secs(6)).await;
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert!(store.price("AAPL").is_some());
        let current = status.snapshot();
        assert_eq!(current.state, RefreshState::Terminating);
        assert!(!current.connected);
        assert_eq!(current.restarts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_aborts_hung_cycle_after_grace() {
        let store = MemoryStore::with_symbols(&["AAPL"]);
        let terminal = MockTerminal::default();
        terminal.script.lock().unwrap().hang_on_quote = true;
        let started = Arc::new(AtomicUsize::new(0));
        let config = SupervisorConfig {
            shutdown_grace: Duration::from_secs(2),
            ..SupervisorConfig::default()
        };
        let (supervisor, status) = supervisor_for(&store, &terminal, config, started);
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(supervisor.run(rx));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(status.snapshot().state, RefreshState::Syncing);

        let requested_at = Instant::now();
        tx.send(true).unwrap();
        handle.await.unwrap().unwrap();

        assert!(requested_at.elapsed() >= Duration::from_secs(2));
        assert_eq!(status.snapshot().state, RefreshState::Terminating);
    }
}
