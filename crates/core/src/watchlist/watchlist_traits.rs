use crate::errors::Result;
use crate::watchlist::watchlist_model::{
    AddSymbolOutcome, NewWatchlistEntry, WatchlistEntry, WatchlistItem,
};
use async_trait::async_trait;

/// Trait for watchlist repository operations
#[async_trait]
pub trait WatchlistRepositoryTrait: Send + Sync {
    fn load_entries(&self) -> Result<Vec<WatchlistEntry>>;
    fn get_entry(&self, symbol: &str) -> Result<Option<WatchlistEntry>>;
    /// Left join of the watchlist with the current price snapshots, ordered by symbol.
    fn load_with_latest_prices(&self) -> Result<Vec<WatchlistItem>>;
    /// Inserts unless the symbol exists. Returns whether a row was inserted.
    async fn insert_entry(&self, entry: NewWatchlistEntry) -> Result<bool>;
    /// Deletes the entries and their snapshots. Returns the number of entries removed.
    async fn delete_entries(&self, symbols: Vec<String>) -> Result<usize>;
}

/// Trait for watchlist service operations
#[async_trait]
pub trait WatchlistServiceTrait: Send + Sync {
    fn get_watchlist(&self) -> Result<Vec<WatchlistEntry>>;
    fn get_watchlist_with_latest_prices(&self) -> Result<Vec<WatchlistItem>>;
    async fn add_symbol(&self, symbol: &str, name: Option<&str>) -> Result<AddSymbolOutcome>;
    async fn remove_symbols(&self, symbols: &[String]) -> Result<usize>;
}
