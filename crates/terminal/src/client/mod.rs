//! Terminal client abstraction.
//!
//! The refresh loop only depends on [`TerminalClient`]. The Interactive
//! Brokers implementation lives in [`crate::ibkr`]; tests substitute
//! scripted clients.

mod traits;

pub use traits::TerminalClient;
