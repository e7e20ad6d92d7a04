//! IB Dashboard Core - Domain entities, services, and traits.
//!
//! This crate contains the data server logic: the watchlist, the price
//! snapshots and caches, the refresh loop and its supervisor.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod cache;
pub mod constants;
pub mod dashboard;
pub mod errors;
pub mod prices;
pub mod refresh;
pub mod status;
pub mod watchlist;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
