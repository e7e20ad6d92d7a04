//! Refresh status models - the health signal of the data server.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// State of the refresh loop.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum RefreshState {
    #[default]
    Disconnected,
    Connecting,
    Syncing,
    Idle,
    Terminating,
    /// The supervisor exhausted its restart budget.
    Failed,
}

impl RefreshState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshState::Disconnected => "disconnected",
            RefreshState::Connecting => "connecting",
            RefreshState::Syncing => "syncing",
            RefreshState::Idle => "idle",
            RefreshState::Terminating => "terminating",
            RefreshState::Failed => "failed",
        }
    }
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disconnected" => Ok(RefreshState::Disconnected),
            "connecting" => Ok(RefreshState::Connecting),
            "syncing" => Ok(RefreshState::Syncing),
            "idle" => Ok(RefreshState::Idle),
            "terminating" => Ok(RefreshState::Terminating),
            "failed" => Ok(RefreshState::Failed),
            other => Err(format!("unknown refresh state '{}'", other)),
        }
    }
}

/// Overall verdict derived from a [`RefreshStatus`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    /// Connected and a cycle succeeded recently.
    Ok,
    /// Connected, but no successful cycle within the staleness window.
    Stale,
    /// No terminal session.
    Disconnected,
    /// The loop is shutting down or gave up.
    Stopped,
}

/// Singleton status row written by the refresh loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RefreshStatus {
    pub state: RefreshState,
    pub connected: bool,
    pub last_cycle_id: Option<i64>,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_successful_cycle_at: Option<DateTime<Utc>>,
    pub consecutive_connect_failures: u32,
    pub restarts: u32,
    pub last_error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self {
            state: RefreshState::Disconnected,
            connected: false,
            last_cycle_id: None,
            last_attempt_at: None,
            last_successful_cycle_at: None,
            consecutive_connect_failures: 0,
            restarts: 0,
            last_error: None,
            updated_at: Utc::now(),
        }
    }
}

impl RefreshStatus {
    /// Classifies the status at `now`. A status with no successful cycle
    /// inside `stale_after` is stale even when connected.
    pub fn health(&self, now: DateTime<Utc>, stale_after: Duration) -> HealthLevel {
        match self.state {
            RefreshState::Terminating | RefreshState::Failed => return HealthLevel::Stopped,
            _ => {}
        }
        if !self.connected {
            return HealthLevel::Disconnected;
        }
        match self.last_successful_cycle_at {
            Some(at) if now - at <= stale_after => HealthLevel::Ok,
            _ => HealthLevel::Stale,
        }
    }
}
