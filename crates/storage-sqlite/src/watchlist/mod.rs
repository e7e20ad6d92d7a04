//! SQLite storage implementation for the watchlist.

mod model;
mod repository;

pub use model::WatchlistEntryDB;
pub use repository::WatchlistRepository;
