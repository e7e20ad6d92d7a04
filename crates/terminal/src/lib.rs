//! ibdash Terminal Crate
//!
//! Adapter between the data server and the brokerage terminal (TWS or
//! IB Gateway).
//!
//! # Overview
//!
//! The crate exposes one abstraction, [`TerminalClient`], covering the
//! requests the refresh loop needs:
//! - connect / disconnect with an explicit, owned session
//! - snapshot quotes with an explicit "unavailable" outcome
//! - historical daily closes as the fallback price source
//! - positions and account summary
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |   Refresh loop   |  (ibdash-core)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  TerminalClient  |  (trait, this crate)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | IbTerminalClient |  (ibapi session)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |  TWS / Gateway   |
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`TerminalEndpoint`] - host, port and API client id
//! - [`Quote`] - a priced observation with derived change
//! - [`QuoteOutcome`] - `Available(Quote)` or `Unavailable`
//! - [`TerminalError`] - failures, classified by [`FaultClass`]

pub mod client;
pub mod errors;
pub mod ibkr;
pub mod models;

pub use client::TerminalClient;
pub use errors::{FaultClass, TerminalError};
pub use ibkr::{IbClientSettings, IbTerminalClient};
pub use models::{
    AccountInfo, AccountValue, MarketDataKind, Position, PriceField, Quote, QuoteOutcome,
    TerminalEndpoint, TickAccumulator,
};
