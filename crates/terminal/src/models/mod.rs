//! Provider-neutral data returned by the terminal adapter.

mod account;
mod endpoint;
mod position;
mod quote;

pub use account::{AccountInfo, AccountValue};
pub use endpoint::{MarketDataKind, TerminalEndpoint};
pub use position::Position;
pub use quote::{PriceField, Quote, QuoteOutcome, TickAccumulator};
