use std::{net::SocketAddr, str::FromStr, time::Duration};

use ibdash_core::constants::{
    DEFAULT_DATA_CLIENT_ID, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_MAX_RECONNECT_BACKOFF,
    DEFAULT_MAX_RESTARTS, DEFAULT_REFRESH_INTERVAL, DEFAULT_RESTART_DELAY,
    DEFAULT_SHUTDOWN_GRACE, DEFAULT_TERMINAL_HOST, DEFAULT_TERMINAL_PORT, DEFAULT_WEB_CLIENT_ID,
};
use ibdash_core::errors::ConfigError;
use ibdash_core::refresh::{RefreshConfig, SupervisorConfig};
use ibdash_terminal::{IbClientSettings, MarketDataKind, TerminalEndpoint};

/// Cycles without success before the status endpoint reports `stale`.
const STALE_AFTER_CYCLES: u32 = 3;

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    pub cors_allow: Vec<String>,
    /// Budget of one HTTP request.
    pub request_timeout: Duration,
    pub endpoint: TerminalEndpoint,
    pub web_client_id: i32,
    pub market_data_kind: MarketDataKind,
    pub refresh_interval: Duration,
    /// Budget of one terminal request.
    pub terminal_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub max_reconnect_backoff: Duration,
    pub shutdown_grace: Duration,
    pub max_restarts: u32,
    pub stale_after: Duration,
    /// Symbols added to the watchlist at startup.
    pub seed_symbols: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Missing keys take their
    /// defaults; present but unparseable keys are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let listen_addr: SocketAddr = parse_or(&lookup, "IBDASH_LISTEN_ADDR", || {
            SocketAddr::from(([127, 0, 0, 1], 8081))
        })?;
        let db_path = lookup("IBDASH_DB_PATH")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "./db/trading_app.db".into());
        let cors_allow = split_list(lookup("IBDASH_CORS_ALLOW_ORIGINS").as_deref().unwrap_or("*"));
        let request_timeout_ms: u64 = parse_or(&lookup, "IBDASH_HTTP_TIMEOUT_MS", || 30_000)?;

        let host = lookup("IB_HOST")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TERMINAL_HOST.to_string());
        let port: u16 = parse_or(&lookup, "IB_PORT", || DEFAULT_TERMINAL_PORT)?;
        let client_id: i32 = parse_or(&lookup, "IB_CLIENT_ID", || DEFAULT_DATA_CLIENT_ID)?;
        let web_client_id: i32 = parse_or(&lookup, "IB_WEB_CLIENT_ID", || DEFAULT_WEB_CLIENT_ID)?;
        if client_id == web_client_id {
            return Err(ConfigError::ClientIdCollision(client_id));
        }
        let market_data_kind: MarketDataKind =
            parse_or(&lookup, "IB_MARKET_DATA_TYPE", MarketDataKind::default)?;

        let refresh_secs: u64 = parse_or(&lookup, "IBDASH_REFRESH_INTERVAL_SECS", || {
            DEFAULT_REFRESH_INTERVAL.as_secs()
        })?;
        if refresh_secs == 0 {
            return Err(invalid("IBDASH_REFRESH_INTERVAL_SECS", "must be at least 1"));
        }
        let terminal_timeout_ms: u64 = parse_or(&lookup, "IBDASH_REQUEST_TIMEOUT_MS", || 4_000)?;
        let max_concurrent_requests: usize = parse_or(&lookup, "IBDASH_MAX_CONCURRENT_REQUESTS", || {
            DEFAULT_MAX_CONCURRENT_REQUESTS
        })?;
        if max_concurrent_requests == 0 {
            return Err(invalid("IBDASH_MAX_CONCURRENT_REQUESTS", "must be at least 1"));
        }
        let backoff_secs: u64 = parse_or(&lookup, "IBDASH_MAX_RECONNECT_BACKOFF_SECS", || {
            DEFAULT_MAX_RECONNECT_BACKOFF.as_secs()
        })?;
        let grace_secs: u64 = parse_or(&lookup, "IBDASH_SHUTDOWN_GRACE_SECS", || {
            DEFAULT_SHUTDOWN_GRACE.as_secs()
        })?;
        let max_restarts: u32 = parse_or(&lookup, "IBDASH_MAX_RESTARTS", || DEFAULT_MAX_RESTARTS)?;
        let stale_after_secs: u64 = parse_or(&lookup, "IBDASH_STALE_AFTER_SECS", || {
            refresh_secs * u64::from(STALE_AFTER_CYCLES)
        })?;
        let seed_symbols = split_list(lookup("IBDASH_SEED_SYMBOLS").as_deref().unwrap_or(""));

        Ok(Self {
            listen_addr,
            db_path,
            cors_allow,
            request_timeout: Duration::from_millis(request_timeout_ms),
            endpoint: TerminalEndpoint::new(host, port, client_id),
            web_client_id,
            market_data_kind,
            refresh_interval: Duration::from_secs(refresh_secs),
            terminal_timeout: Duration::from_millis(terminal_timeout_ms),
            max_concurrent_requests,
            max_reconnect_backoff: Duration::from_secs(backoff_secs),
            shutdown_grace: Duration::from_secs(grace_secs),
            max_restarts,
            stale_after: Duration::from_secs(stale_after_secs),
            seed_symbols,
        })
    }

    pub fn refresh_config(&self) -> RefreshConfig {
        RefreshConfig {
            endpoint: self.endpoint.clone(),
            interval: self.refresh_interval,
            max_reconnect_backoff: self.max_reconnect_backoff,
            max_concurrent_requests: self.max_concurrent_requests,
        }
    }

    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            max_restarts: self.max_restarts,
            restart_delay: DEFAULT_RESTART_DELAY,
            shutdown_grace: self.shutdown_grace,
        }
    }

    pub fn client_settings(&self) -> IbClientSettings {
        IbClientSettings {
            request_timeout: self.terminal_timeout,
            market_data_kind: self.market_data_kind,
            ..IbClientSettings::default()
        }
    }
}

fn invalid(key: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_or<T, F, D>(lookup: &F, key: &str, default: D) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
    D: FnOnce() -> T,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, format!("'{}': {}", raw, e))),
        _ => Ok(default()),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
