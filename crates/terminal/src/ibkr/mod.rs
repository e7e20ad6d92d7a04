//! Interactive Brokers implementation of [`TerminalClient`].
//!
//! Talks to TWS or IB Gateway through the `ibapi` crate. All requests are
//! bounded by [`IbClientSettings::request_timeout`]; a snapshot quote that
//! does not produce a usable price within that window is reported as
//! [`QuoteOutcome::Unavailable`] instead of an error.

mod convert;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use ibapi::accounts::types::AccountGroup;
use ibapi::accounts::{AccountSummaryResult, AccountSummaryTags, PositionUpdate};
use ibapi::contracts::Contract;
use ibapi::market_data::historical::{BarSize, ToDuration, WhatToShow};
use ibapi::market_data::realtime::TickTypes;
use ibapi::market_data::TradingHours;
use ibapi::Client;
use log::{debug, info, warn};
use tokio::time::{timeout, timeout_at, Instant};

use crate::client::TerminalClient;
use crate::errors::TerminalError;
use crate::models::{
    AccountInfo, MarketDataKind, Position, Quote, QuoteOutcome, TerminalEndpoint,
    TickAccumulator,
};

use convert::{classify_error, market_data_type, price_field, position_from, volume_tick};

/// Default bound on a single terminal request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(4);

/// Default bound on the connection handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Tunables for [`IbTerminalClient`].
#[derive(Clone, Debug)]
pub struct IbClientSettings {
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub market_data_kind: MarketDataKind,
}

impl Default for IbClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            market_data_kind: MarketDataKind::default(),
        }
    }
}

/// Terminal client backed by an `ibapi` session.
pub struct IbTerminalClient {
    settings: IbClientSettings,
    client: Option<Client>,
    endpoint: Option<TerminalEndpoint>,
    connected: AtomicBool,
}

impl IbTerminalClient {
    pub fn new(settings: IbClientSettings) -> Self {
        Self {
            settings,
            client: None,
            endpoint: None,
            connected: AtomicBool::new(false),
        }
    }

    fn session(&self) -> Result<&Client, TerminalError> {
        match &self.client {
            Some(client) if self.connected.load(Ordering::Acquire) => Ok(client),
            _ => Err(TerminalError::NotConnected),
        }
    }

    /// Marks the session dead when a request reports a session fault.
    fn observe<T>(&self, result: Result<T, TerminalError>) -> Result<T, TerminalError> {
        if let Err(e) = &result {
            if e.is_connection_fault() && self.connected.swap(false, Ordering::AcqRel) {
                warn!("Terminal session lost: {}", e);
            }
        }
        result
    }

    fn stock(symbol: &str) -> Contract {
        Contract::stock(symbol).build()
    }
}

#[async_trait]
impl TerminalClient for IbTerminalClient {
    async fn connect(&mut self, endpoint: &TerminalEndpoint) -> Result<(), TerminalError> {
        self.disconnect().await;

        let address = endpoint.address();
        info!("Connecting to terminal at {}", endpoint);

        let client = match timeout(
            self.settings.connect_timeout,
            Client::connect(&address, endpoint.client_id),
        )
        .await
        {
            Ok(Ok(client)) => client,
            Ok(Err(e)) => {
                return Err(TerminalError::ConnectionFailed {
                    endpoint: address,
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(TerminalError::ConnectionFailed {
                    endpoint: address,
                    message: format!(
                        "handshake timed out after {:?}",
                        self.settings.connect_timeout
                    ),
                })
            }
        };

        let kind = self.settings.market_data_kind;
        match timeout(
            self.settings.request_timeout,
            client.switch_market_data_type(market_data_type(kind)),
        )
        .await
        {
            Ok(Ok(())) => debug!("Market data type set to {:?}", kind),
            Ok(Err(e)) => warn!("Failed to set market data type {:?}: {}", kind, e),
            Err(_) => warn!("Timed out setting market data type {:?}", kind),
        }

        info!("Connected to terminal at {}", endpoint);
        self.client = Some(client);
        self.endpoint = Some(endpoint.clone());
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Acquire)
    }

    async fn disconnect(&mut self) {
        self.connected.store(false, Ordering::Release);
        if let Some(client) = self.client.take() {
            if let Some(endpoint) = self.endpoint.take() {
                info!("Disconnecting from terminal at {}", endpoint);
            }
            // The session is closed when the client is dropped.
            drop(client);
        }
    }

    async fn fetch_positions(&self) -> Result<Vec<Position>, TerminalError> {
        self.observe(self.request_positions().await)
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteOutcome, TerminalError> {
        self.observe(self.request_quote(symbol).await)
    }

    async fn fetch_historical_close(&self, symbol: &str) -> Result<Quote, TerminalError> {
        self.observe(self.request_historical_close(symbol).await)
    }

    async fn fetch_account_summary(&self) -> Result<AccountInfo, TerminalError> {
        self.observe(self.request_account_summary().await)
    }
}

impl IbTerminalClient {
    async fn request_positions(&self) -> Result<Vec<Position>, TerminalError> {
        let client = self.session()?;
        let operation = "positions";

        let collect = async {
            let mut subscription = client
                .positions()
                .await
                .map_err(|e| classify_error(operation, &e))?;

            let mut positions = Vec::new();
            while let Some(update) = subscription.next().await {
                match update.map_err(|e| classify_error(operation, &e))? {
                    PositionUpdate::Position(position) => positions.push(position_from(&position)),
                    PositionUpdate::PositionEnd => break,
                }
            }
            Ok(positions)
        };

        timeout(self.settings.request_timeout, collect)
            .await
            .map_err(|_| TerminalError::timeout(operation))?
    }

    async fn request_quote(&self, symbol: &str) -> Result<QuoteOutcome, TerminalError> {
        let client = self.session()?;
        let operation = format!("quote {}", symbol);
        let contract = Self::stock(symbol);
        let deadline = Instant::now() + self.settings.request_timeout;

        let mut subscription = match timeout_at(
            deadline,
            client.market_data(&contract).snapshot().subscribe(),
        )
        .await
        {
            Ok(result) => result.map_err(|e| classify_error(&operation, &e))?,
            Err(_) => return Err(TerminalError::timeout(operation)),
        };

        let mut ticks = TickAccumulator::new();
        loop {
            let next = match timeout_at(deadline, subscription.next()).await {
                Ok(next) => next,
                Err(_) => {
                    debug!("Snapshot for {} hit the wait bound", symbol);
                    break;
                }
            };
            let Some(tick) = next else { break };

            match tick {
                Ok(TickTypes::Price(tick)) => {
                    if let Some(field) = price_field(&tick.tick_type) {
                        ticks.record_price(field, tick.price);
                    }
                }
                Ok(TickTypes::PriceSize(tick)) => {
                    if let Some(field) = price_field(&tick.price_tick_type) {
                        ticks.record_price(field, tick.price);
                    }
                }
                Ok(TickTypes::Size(tick)) => {
                    if volume_tick(&tick.tick_type) {
                        ticks.record_volume(tick.size);
                    }
                }
                Ok(TickTypes::SnapshotEnd) => break,
                Ok(_) => {}
                Err(e) => {
                    let error = classify_error(&operation, &e);
                    if error.is_connection_fault() {
                        return Err(error);
                    }
                    // Terminal notices such as "no market data permissions"
                    // end the snapshot without a price.
                    debug!("Snapshot for {} ended early: {}", symbol, error);
                    break;
                }
            }

            if ticks.is_complete() {
                break;
            }
        }

        Ok(ticks.into_outcome(symbol, Utc::now()))
    }

    async fn request_historical_close(&self, symbol: &str) -> Result<Quote, TerminalError> {
        let client = self.session()?;
        let operation = format!("historical {}", symbol);
        let contract = Self::stock(symbol);

        let request = client.historical_data(
            &contract,
            None,
            2.days(),
            BarSize::Day,
            Some(WhatToShow::Trades),
            TradingHours::Regular,
        );

        let data = timeout(self.settings.request_timeout, request)
            .await
            .map_err(|_| TerminalError::timeout(operation.clone()))?
            .map_err(|e| classify_error(&operation, &e))?;

        let closes: Vec<(f64, f64)> = data.bars.iter().map(|bar| (bar.close, bar.volume)).collect();
        let Some(&(close, volume)) = closes.last() else {
            return Err(TerminalError::NoHistoricalData(symbol.to_string()));
        };

        let mut quote = Quote::new(symbol, close, Utc::now());
        if closes.len() >= 2 {
            quote = quote.with_previous_close(closes[closes.len() - 2].0);
        }
        if volume.is_finite() && volume >= 0.0 {
            quote = quote.with_volume(volume.round() as i64);
        }
        Ok(quote)
    }

    async fn request_account_summary(&self) -> Result<AccountInfo, TerminalError> {
        let client = self.session()?;
        let operation = "account summary";

        let collect = async {
            let managed_accounts = client
                .managed_accounts()
                .await
                .map_err(|e| classify_error(operation, &e))?;

            let mut info = AccountInfo {
                managed_accounts,
                ..Default::default()
            };

            let mut subscription = client
                .account_summary(&AccountGroup("All".to_string()), AccountSummaryTags::ALL)
                .await
                .map_err(|e| classify_error(operation, &e))?;

            while let Some(item) = subscription.next().await {
                match item.map_err(|e| classify_error(operation, &e))? {
                    AccountSummaryResult::Summary(summary) => info.insert(
                        summary.account,
                        summary.tag,
                        summary.value,
                        summary.currency,
                    ),
                    AccountSummaryResult::End => break,
                }
            }
            Ok(info)
        };

        timeout(self.settings.request_timeout, collect)
            .await
            .map_err(|_| TerminalError::timeout(operation))?
    }
}
