use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;

use ibdash_core::watchlist::{
    NewWatchlistEntry, WatchlistEntry, WatchlistItem, WatchlistRepositoryTrait,
};
use ibdash_core::Result;

use super::model::{to_item, WatchlistEntryDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::prices::PriceDataDB;
use crate::schema::{price_data, watchlist};
use crate::utils::chunk_for_sqlite;

pub struct WatchlistRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl WatchlistRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        WatchlistRepository { pool, writer }
    }
}

#[async_trait]
impl WatchlistRepositoryTrait for WatchlistRepository {
    fn load_entries(&self) -> Result<Vec<WatchlistEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = watchlist::table
            .select(WatchlistEntryDB::as_select())
            .order(watchlist::symbol.asc())
            .load::<WatchlistEntryDB>(&mut conn)
            .into_core()?;
        rows.into_iter()
            .map(|row| WatchlistEntry::try_from(row).map_err(Into::into))
            .collect()
    }

    fn get_entry(&self, symbol: &str) -> Result<Option<WatchlistEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let row = watchlist::table
            .find(symbol)
            .select(WatchlistEntryDB::as_select())
            .first::<WatchlistEntryDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(WatchlistEntry::try_from).transpose()?)
    }

    fn load_with_latest_prices(&self) -> Result<Vec<WatchlistItem>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = watchlist::table
            .left_join(price_data::table)
            .select((
                WatchlistEntryDB::as_select(),
                Option::<PriceDataDB>::as_select(),
            ))
            .order(watchlist::symbol.asc())
            .load::<(WatchlistEntryDB, Option<PriceDataDB>)>(&mut conn)
            .into_core()?;
        rows.into_iter()
            .map(|(entry, price)| to_item(entry, price).map_err(Into::into))
            .collect()
    }

    async fn insert_entry(&self, entry: NewWatchlistEntry) -> Result<bool> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let row = WatchlistEntryDB::from(entry);
                let inserted = diesel::insert_into(watchlist::table)
                    .values(&row)
                    .on_conflict_do_nothing()
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(inserted > 0)
            })
            .await
    }

    async fn delete_entries(&self, symbols: Vec<String>) -> Result<usize> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                let mut removed = 0;
                for chunk in chunk_for_sqlite(&symbols) {
                    diesel::delete(price_data::table.filter(price_data::symbol.eq_any(chunk)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    removed += diesel::delete(watchlist::table.filter(watchlist::symbol.eq_any(chunk)))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(removed)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use crate::prices::PriceRepository;
    use chrono::{TimeZone, Utc};
    use ibdash_core::prices::{PriceRepositoryTrait, PriceSnapshot, PriceSource};
    use tempfile::tempdir;

    fn setup() -> (WatchlistRepository, PriceRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test.db").to_string_lossy().to_string();
        let pool = create_pool(&db_path).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (
            WatchlistRepository::new(pool.clone(), writer.clone()),
            PriceRepository::new(pool, writer),
            temp_dir,
        )
    }

    fn new_entry(symbol: &str) -> NewWatchlistEntry {
        NewWatchlistEntry {
            symbol: symbol.to_string(),
            name: format!("{} Inc.", symbol),
            added_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
        }
    }

    fn snapshot(symbol: &str, price: f64, cycle_id: i64) -> PriceSnapshot {
        PriceSnapshot {
            symbol: symbol.to_string(),
            price,
            change: 1.5,
            change_pct: 0.8,
            volume: 1_000,
            bid: Some(price - 0.01),
            ask: Some(price + 0.01),
            close_price: Some(price - 1.5),
            source: PriceSource::Live,
            observed_at: Utc.with_ymd_and_hms(2024, 3, 1, 15, 30, 0).unwrap(),
            cycle_id,
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let (repo, _prices, _dir) = setup();

        assert!(repo.insert_entry(new_entry("AAPL")).await.unwrap());
        assert!(!repo.insert_entry(new_entry("AAPL")).await.unwrap());

        let entries = repo.load_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "AAPL Inc.");
        assert_eq!(entries[0].added_at, Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap());
        assert!(repo.get_entry("AAPL").unwrap().is_some());
        assert!(repo.get_entry("MSFT").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_left_join_includes_symbols_without_prices() {
        let (repo, prices, _dir) = setup();
        repo.insert_entry(new_entry("MSFT")).await.unwrap();
        repo.insert_entry(new_entry("AAPL")).await.unwrap();
        prices
            .replace_snapshots(vec![snapshot("MSFT", 410.0, 1)])
            .await
            .unwrap();

        let items = repo.load_with_latest_prices().unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].symbol, "AAPL");
        assert!(items[0].price.is_none());
        assert!(items[0].source.is_none());
        assert_eq!(items[1].symbol, "MSFT");
        assert_eq!(items[1].price, Some(410.0));
        assert_eq!(items[1].source, Some(PriceSource::Live));
        assert_eq!(items[1].volume, Some(1_000));
    }

    #[tokio::test]
    async fn test_delete_removes_entries_and_their_prices() {
        let (repo, prices, _dir) = setup();
        repo.insert_entry(new_entry("AAPL")).await.unwrap();
        repo.insert_entry(new_entry("MSFT")).await.unwrap();
        prices
            .replace_snapshots(vec![snapshot("AAPL", 190.0, 1), snapshot("MSFT", 410.0, 1)])
            .await
            .unwrap();

        let removed = repo
            .delete_entries(vec!["AAPL".to_string(), "TSLA".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(repo.get_entry("AAPL").unwrap().is_none());
        assert!(prices.get_snapshot("AAPL").unwrap().is_none());
        assert!(prices.get_snapshot("MSFT").unwrap().is_some());
    }
}
