//! Terminal client trait definition.

use async_trait::async_trait;

use crate::errors::TerminalError;
use crate::models::{AccountInfo, Position, Quote, QuoteOutcome, TerminalEndpoint};

/// A single API session to the brokerage terminal.
///
/// The session is an owned resource: the instance is held by exactly one
/// refresh loop, which drives `connect`/`disconnect` explicitly. Every
/// request is bounded by the implementation's request timeout.
///
/// Implementations never reconnect on their own. When a request observes
/// a dropped session it returns a session-class error (see
/// [`TerminalError::is_connection_fault`]) and `is_connected` turns false.
///
/// # Example
///
/// ```ignore
/// let mut client = IbTerminalClient::new(IbClientSettings::default());
/// client.connect(&TerminalEndpoint::new("127.0.0.1", 7498, 10)).await?;
///
/// match client.fetch_quote("AAPL").await? {
///     QuoteOutcome::Available(quote) => println!("{} {}", quote.symbol, quote.price),
///     QuoteOutcome::Unavailable => {
///         let quote = client.fetch_historical_close("AAPL").await?;
///         println!("{} closed at {}", quote.symbol, quote.price);
///     }
/// }
/// ```
#[async_trait]
pub trait TerminalClient: Send + Sync {
    /// Opens the session. Replaces any previous session held by this instance.
    async fn connect(&mut self, endpoint: &TerminalEndpoint) -> Result<(), TerminalError>;

    /// Whether the session is believed to be usable.
    fn is_connected(&self) -> bool;

    /// Closes the session. Calling it while disconnected is a no-op.
    async fn disconnect(&mut self);

    /// Current holdings across managed accounts. Empty is a valid answer.
    async fn fetch_positions(&self) -> Result<Vec<Position>, TerminalError>;

    /// Snapshot quote for a symbol.
    ///
    /// Returns [`QuoteOutcome::Unavailable`] when no usable price arrives
    /// within the bounded wait.
    async fn fetch_quote(&self, symbol: &str) -> Result<QuoteOutcome, TerminalError>;

    /// Most recent daily close, used when no live quote is available.
    async fn fetch_historical_close(&self, symbol: &str) -> Result<Quote, TerminalError>;

    /// Account summary for every managed account.
    async fn fetch_account_summary(&self) -> Result<AccountInfo, TerminalError>;
}
