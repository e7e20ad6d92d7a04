use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::{CacheKind, CacheRepositoryTrait, CachedPayload};
use crate::errors::Result;
use crate::status::{RefreshStatus, StatusRepositoryTrait};
use crate::watchlist::{AddSymbolOutcome, WatchlistItem, WatchlistServiceTrait};

/// Contract offered to the web layer.
///
/// Every read goes to the store only; nothing here touches the terminal.
#[async_trait]
pub trait DashboardServiceTrait: Send + Sync {
    fn get_watchlist_with_latest_prices(&self) -> Result<Vec<WatchlistItem>>;
    fn get_account_cache(&self) -> Result<Option<CachedPayload>>;
    fn get_portfolio_cache(&self) -> Result<Option<CachedPayload>>;
    fn get_refresh_status(&self) -> Result<Option<RefreshStatus>>;
    async fn add_symbol(&self, symbol: &str, name: Option<&str>) -> Result<AddSymbolOutcome>;
    async fn remove_symbols(&self, symbols: &[String]) -> Result<usize>;
}

pub struct DashboardService {
    watchlist_service: Arc<dyn WatchlistServiceTrait>,
    cache_repository: Arc<dyn CacheRepositoryTrait>,
    status_repository: Arc<dyn StatusRepositoryTrait>,
}

impl DashboardService {
    pub fn new(
        watchlist_service: Arc<dyn WatchlistServiceTrait>,
        cache_repository: Arc<dyn CacheRepositoryTrait>,
        status_repository: Arc<dyn StatusRepositoryTrait>,
    ) -> Self {
        DashboardService {
            watchlist_service,
            cache_repository,
            status_repository,
        }
    }
}

#[async_trait]
impl DashboardServiceTrait for DashboardService {
    fn get_watchlist_with_latest_prices(&self) -> Result<Vec<WatchlistItem>> {
        self.watchlist_service.get_watchlist_with_latest_prices()
    }

    fn get_account_cache(&self) -> Result<Option<CachedPayload>> {
        self.cache_repository.get_cache(CacheKind::Account)
    }

    fn get_portfolio_cache(&self) -> Result<Option<CachedPayload>> {
        self.cache_repository.get_cache(CacheKind::Portfolio)
    }

    fn get_refresh_status(&self) -> Result<Option<RefreshStatus>> {
        self.status_repository.load_status()
    }

    async fn add_symbol(&self, symbol: &str, name: Option<&str>) -> Result<AddSymbolOutcome> {
        self.watchlist_service.add_symbol(symbol, name).await
    }

    async fn remove_symbols(&self, symbols: &[String]) -> Result<usize> {
        self.watchlist_service.remove_symbols(symbols).await
    }
}
