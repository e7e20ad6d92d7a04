use std::time::Duration;

/// Cadence of the refresh loop
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Upper bound of the reconnect backoff
pub const DEFAULT_MAX_RECONNECT_BACKOFF: Duration = Duration::from_secs(60);

/// Symbol requests in flight at once within a cycle
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// Time the in-flight cycle gets to finish after a shutdown signal
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Restarts of a crashed refresh loop before giving up
pub const DEFAULT_MAX_RESTARTS: u32 = 3;

/// Base delay between restarts; the n-th restart waits n times this
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(2);

/// Default terminal host
pub const DEFAULT_TERMINAL_HOST: &str = "127.0.0.1";

/// Default terminal API port
pub const DEFAULT_TERMINAL_PORT: u16 = 7498;

/// API client id of the data server session
pub const DEFAULT_DATA_CLIENT_ID: i32 = 10;

/// API client id reserved for the web layer's own session
pub const DEFAULT_WEB_CLIENT_ID: i32 = 1;

/// Longest accepted ticker
pub const MAX_SYMBOL_LEN: usize = 12;
