//! Price snapshot domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ibdash_terminal::Quote;
use serde::{Deserialize, Serialize};

/// Where a snapshot's price came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Snapshot quote from the terminal (live or delayed feed).
    Live,
    /// Last daily bar close, used when no quote was available.
    Historical,
    /// Both paths failed this cycle; the values are from an earlier cycle.
    Stale,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Live => "live",
            PriceSource::Historical => "historical",
            PriceSource::Stale => "stale",
        }
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "live" => Ok(PriceSource::Live),
            "historical" => Ok(PriceSource::Historical),
            "stale" => Ok(PriceSource::Stale),
            other => Err(format!("unknown price source '{}'", other)),
        }
    }
}

/// Current price of one watchlist symbol.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceSnapshot {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: i64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub close_price: Option<f64>,
    pub source: PriceSource,
    pub observed_at: DateTime<Utc>,
    /// Cycle that last wrote this row.
    pub cycle_id: i64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl PriceSnapshot {
    /// Builds a fresh snapshot from a terminal quote.
    pub fn from_quote(quote: &Quote, source: PriceSource, cycle_id: i64) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            price: quote.price,
            change: round2(quote.change()),
            change_pct: round2(quote.change_pct()),
            volume: quote.volume.unwrap_or(0),
            bid: quote.bid,
            ask: quote.ask,
            close_price: quote.previous_close,
            source,
            observed_at: quote.observed_at,
            cycle_id,
        }
    }

    /// Carries the previous values into `cycle_id` with a stale marker.
    /// `observed_at` keeps pointing at the last real observation.
    pub fn to_stale(&self, cycle_id: i64) -> Self {
        Self {
            source: PriceSource::Stale,
            cycle_id,
            ..self.clone()
        }
    }
}

/// Outcome of a price table replacement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceWriteSummary {
    /// Rows upserted for this cycle.
    pub written: usize,
    /// Snapshots dropped because their symbol was removed mid-cycle.
    pub skipped: usize,
    /// Orphan rows deleted.
    pub purged: usize,
}
