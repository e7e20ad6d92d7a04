//! Error types and fault classification for the terminal adapter.
//!
//! This module provides:
//! - [`TerminalError`]: The error enum for every terminal operation
//! - [`FaultClass`]: Classification used by the refresh loop to decide
//!   whether the session is still usable after a failure

mod fault;

pub use fault::FaultClass;

use thiserror::Error;

/// Errors that can occur while talking to the brokerage terminal.
///
/// "No live data for this symbol" is deliberately not represented here.
/// That condition is a normal outcome and is reported as
/// [`QuoteOutcome::Unavailable`](crate::models::QuoteOutcome::Unavailable).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerminalError {
    /// The terminal could not be reached or refused the session
    /// (unreachable host, duplicate client id, API disabled).
    #[error("Connection to {endpoint} failed: {message}")]
    ConnectionFailed {
        /// `host:port` of the terminal
        endpoint: String,
        /// Error reported by the socket or the terminal
        message: String,
    },

    /// A request was issued while no session is open.
    #[error("Not connected to the terminal")]
    NotConnected,

    /// The session dropped while a request was in flight.
    #[error("Connection to the terminal was lost: {0}")]
    ConnectionLost(String),

    /// The terminal did not answer within the bounded wait.
    #[error("Timed out waiting for {operation}")]
    Timeout {
        /// The request that timed out
        operation: String,
    },

    /// The terminal rejected a specific request
    /// (unknown contract, no permissions, pacing violation).
    #[error("{operation} rejected: {message}")]
    Rejected {
        /// The request that was rejected
        operation: String,
        /// The message returned by the terminal
        message: String,
    },

    /// The historical request completed but returned no bars.
    #[error("No historical data for {0}")]
    NoHistoricalData(String),
}

impl TerminalError {
    /// Returns the fault classification for this error.
    ///
    /// ```
    /// use ibdash_terminal::errors::{FaultClass, TerminalError};
    ///
    /// let error = TerminalError::ConnectionLost("socket closed".to_string());
    /// assert_eq!(error.fault_class(), FaultClass::Session);
    ///
    /// let error = TerminalError::NoHistoricalData("ZZZZ".to_string());
    /// assert_eq!(error.fault_class(), FaultClass::Request);
    /// ```
    pub fn fault_class(&self) -> FaultClass {
        match self {
            Self::ConnectionFailed { .. } | Self::NotConnected | Self::ConnectionLost(_) => {
                FaultClass::Session
            }
            Self::Timeout { .. } | Self::Rejected { .. } | Self::NoHistoricalData(_) => {
                FaultClass::Request
            }
        }
    }

    /// True when the error invalidates the current session.
    pub fn is_connection_fault(&self) -> bool {
        self.fault_class() == FaultClass::Session
    }

    pub(crate) fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub(crate) fn rejected(operation: impl Into<String>, message: impl ToString) -> Self {
        Self::Rejected {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}
