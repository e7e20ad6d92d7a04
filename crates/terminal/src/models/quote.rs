//! Quote types returned by the terminal adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A priced observation for one symbol.
///
/// `previous_close` is the reference used for the daily change. It is the
/// close tick for live quotes and the prior bar's close for historical ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: Option<f64>,
    pub volume: Option<i64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(symbol: impl Into<String>, price: f64, observed_at: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            previous_close: None,
            volume: None,
            bid: None,
            ask: None,
            observed_at,
        }
    }

    pub fn with_previous_close(mut self, close: f64) -> Self {
        self.previous_close = Some(close);
        self
    }

    pub fn with_volume(mut self, volume: i64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_bid_ask(mut self, bid: Option<f64>, ask: Option<f64>) -> Self {
        self.bid = bid;
        self.ask = ask;
        self
    }

    fn reference_close(&self) -> Option<f64> {
        self.previous_close.filter(|c| c.is_finite() && *c > 0.0)
    }

    /// Absolute change against the reference close, 0 when there is none.
    pub fn change(&self) -> f64 {
        self.reference_close()
            .map(|close| self.price - close)
            .unwrap_or(0.0)
    }

    /// Percent change against the reference close, 0 when there is none.
    pub fn change_pct(&self) -> f64 {
        self.reference_close()
            .map(|close| (self.price - close) / close * 100.0)
            .unwrap_or(0.0)
    }
}

/// Result of a live quote request.
///
/// `Unavailable` is the normal "no live data within the bounded wait"
/// outcome and is what triggers the historical fallback.
#[derive(Clone, Debug, PartialEq)]
pub enum QuoteOutcome {
    Available(Quote),
    Unavailable,
}

impl QuoteOutcome {
    pub fn into_quote(self) -> Option<Quote> {
        match self {
            Self::Available(quote) => Some(quote),
            Self::Unavailable => None,
        }
    }
}

/// Price fields a snapshot request can report.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PriceField {
    Last,
    Bid,
    Ask,
    Close,
}

/// Collects ticks of a snapshot request and selects the display price.
///
/// Selection order is last trade, then the bid/ask midpoint. A response
/// carrying only a close is treated as unavailable so the historical path
/// can supply a proper day-over-day change.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickAccumulator {
    last: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
    close: Option<f64>,
    volume: Option<i64>,
}

impl TickAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a price tick. The terminal sends -1 for "no value"; such
    /// ticks are ignored.
    pub fn record_price(&mut self, field: PriceField, price: f64) {
        if !price.is_finite() || price <= 0.0 {
            return;
        }
        let slot = match field {
            PriceField::Last => &mut self.last,
            PriceField::Bid => &mut self.bid,
            PriceField::Ask => &mut self.ask,
            PriceField::Close => &mut self.close,
        };
        *slot = Some(price);
    }

    pub fn record_volume(&mut self, volume: f64) {
        if volume.is_finite() && volume >= 0.0 {
            self.volume = Some(volume.round() as i64);
        }
    }

    /// True once every field the selection cares about has arrived.
    pub fn is_complete(&self) -> bool {
        self.last.is_some() && self.close.is_some() && self.volume.is_some()
    }

    fn midpoint(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => None,
        }
    }

    pub fn into_outcome(self, symbol: &str, observed_at: DateTime<Utc>) -> QuoteOutcome {
        let Some(price) = self.last.or_else(|| self.midpoint()) else {
            return QuoteOutcome::Unavailable;
        };

        let mut quote = Quote::new(symbol, price, observed_at).with_bid_ask(self.bid, self.ask);
        quote.previous_close = self.close;
        quote.volume = self.volume;
        QuoteOutcome::Available(quote)
    }
}
