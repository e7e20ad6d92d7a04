//! Watchlist module - domain models, services, and traits.
//!
//! The web layer is the only writer of watchlist entries. The refresh loop
//! reads the list every cycle.

mod company_names;
mod watchlist_model;
mod watchlist_service;
mod watchlist_traits;

pub use company_names::company_name;
pub use watchlist_model::{
    normalize_symbol, AddSymbolOutcome, NewWatchlistEntry, WatchlistEntry, WatchlistItem,
};
pub use watchlist_service::WatchlistService;
pub use watchlist_traits::{WatchlistRepositoryTrait, WatchlistServiceTrait};
