use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};

use super::company_names::company_name;
use super::watchlist_model::{
    normalize_symbol, AddSymbolOutcome, NewWatchlistEntry, WatchlistEntry, WatchlistItem,
};
use super::watchlist_traits::{WatchlistRepositoryTrait, WatchlistServiceTrait};
use crate::errors::Result;

/// Write and read contract used by the web layer for the watchlist.
pub struct WatchlistService {
    repository: Arc<dyn WatchlistRepositoryTrait>,
}

impl WatchlistService {
    pub fn new(repository: Arc<dyn WatchlistRepositoryTrait>) -> Self {
        WatchlistService { repository }
    }
}

#[async_trait]
impl WatchlistServiceTrait for WatchlistService {
    fn get_watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        self.repository.load_entries()
    }

    fn get_watchlist_with_latest_prices(&self) -> Result<Vec<WatchlistItem>> {
        self.repository.load_with_latest_prices()
    }

    async fn add_symbol(&self, symbol: &str, name: Option<&str>) -> Result<AddSymbolOutcome> {
        let symbol = normalize_symbol(symbol)?;
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| company_name(&symbol));

        let inserted = self
            .repository
            .insert_entry(NewWatchlistEntry {
                symbol: symbol.clone(),
                name,
                added_at: Utc::now(),
            })
            .await?;

        if inserted {
            info!("Added {} to the watchlist", symbol);
            Ok(AddSymbolOutcome::Added)
        } else {
            debug!("{} is already on the watchlist", symbol);
            Ok(AddSymbolOutcome::AlreadyPresent)
        }
    }

    async fn remove_symbols(&self, symbols: &[String]) -> Result<usize> {
        // Unparseable symbols cannot be on the watchlist.
        let normalized: BTreeSet<String> = symbols
            .iter()
            .filter_map(|s| normalize_symbol(s).ok())
            .collect();
        if normalized.is_empty() {
            return Ok(0);
        }

        let removed = self
            .repository
            .delete_entries(normalized.into_iter().collect())
            .await?;
        info!("Removed {} symbol(s) from the watchlist", removed);
        Ok(removed)
    }
}
