//! Mapping between `ibapi` types and the adapter's own models.

use ibapi::contracts::tick_types::TickType;
use ibapi::market_data::MarketDataType;

use crate::errors::TerminalError;
use crate::models::{MarketDataKind, Position, PriceField};

/// Fragments of `ibapi` error messages that mean the socket is gone.
const SESSION_FAULT_MARKERS: &[&str] = &[
    "not connected",
    "connection reset",
    "connection refused",
    "connection aborted",
    "connection closed",
    "connection lost",
    "broken pipe",
    "shutdown",
    "end of file",
    "eof",
];

pub(super) fn classify_error(operation: &str, error: &ibapi::Error) -> TerminalError {
    classify_message(operation, &error.to_string())
}

pub(super) fn classify_message(operation: &str, message: &str) -> TerminalError {
    let lowered = message.to_ascii_lowercase();
    if SESSION_FAULT_MARKERS.iter().any(|m| lowered.contains(m)) {
        TerminalError::ConnectionLost(format!("{}: {}", operation, message))
    } else {
        TerminalError::rejected(operation, message)
    }
}

pub(super) fn market_data_type(kind: MarketDataKind) -> MarketDataType {
    match kind {
        MarketDataKind::Live => MarketDataType::Realtime,
        MarketDataKind::Frozen => MarketDataType::Frozen,
        MarketDataKind::Delayed => MarketDataType::Delayed,
        MarketDataKind::DelayedFrozen => MarketDataType::DelayedFrozen,
    }
}

/// Live and delayed variants of a tick map to the same field.
pub(super) fn price_field(tick_type: &TickType) -> Option<PriceField> {
    match tick_type {
        TickType::Last | TickType::DelayedLast => Some(PriceField::Last),
        TickType::Bid | TickType::DelayedBid => Some(PriceField::Bid),
        TickType::Ask | TickType::DelayedAsk => Some(PriceField::Ask),
        TickType::Close | TickType::DelayedClose => Some(PriceField::Close),
        _ => None,
    }
}

pub(super) fn volume_tick(tick_type: &TickType) -> bool {
    matches!(tick_type, TickType::Volume | TickType::DelayedVolume)
}

pub(super) fn position_from(position: &ibapi::accounts::Position) -> Position {
    let contract = &position.contract;
    Position {
        account: position.account.clone(),
        symbol: contract.symbol.to_string(),
        sec_type: contract.security_type.to_string(),
        exchange: contract.exchange.to_string(),
        currency: contract.currency.to_string(),
        position: position.position,
        average_cost: position.average_cost,
    }
}
