//! Watchlist domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::MAX_SYMBOL_LEN;
use crate::errors::ValidationError;
use crate::prices::PriceSource;

/// A symbol tracked for price display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub symbol: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

/// Input model for adding a symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewWatchlistEntry {
    pub symbol: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
}

/// Result of an add request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AddSymbolOutcome {
    Added,
    AlreadyPresent,
}

/// A watchlist row joined with its current snapshot, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub symbol: String,
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub change_pct: Option<f64>,
    pub volume: Option<i64>,
    pub source: Option<PriceSource>,
    pub observed_at: Option<DateTime<Utc>>,
}

impl WatchlistItem {
    /// True when the web layer should render a staleness marker.
    pub fn is_stale(&self) -> bool {
        matches!(self.source, Some(PriceSource::Stale))
    }
}

/// Trims and upper-cases a ticker, rejecting anything the terminal could
/// not resolve as a stock symbol.
///
/// ```
/// use ibdash_core::watchlist::normalize_symbol;
///
/// assert_eq!(normalize_symbol(" brk.b ").unwrap(), "BRK.B");
/// assert!(normalize_symbol("").is_err());
/// ```
pub fn normalize_symbol(raw: &str) -> Result<String, ValidationError> {
    let symbol = raw.trim().to_ascii_uppercase();
    let invalid = |reason: &str| ValidationError::InvalidSymbol {
        symbol: raw.to_string(),
        reason: reason.to_string(),
    };

    if symbol.is_empty() {
        return Err(invalid("symbol is empty"));
    }
    if symbol.len() > MAX_SYMBOL_LEN {
        return Err(invalid("symbol is too long"));
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '/'))
    {
        return Err(invalid("unsupported character"));
    }
    Ok(symbol)
}
