use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use diesel::dsl::{max, not};
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;

use ibdash_core::prices::{PriceRepositoryTrait, PriceSnapshot, PriceWriteSummary};
use ibdash_core::Result;

use super::model::PriceDataDB;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{price_data, watchlist};

pub struct PriceRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PriceRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        PriceRepository { pool, writer }
    }
}

#[async_trait]
impl PriceRepositoryTrait for PriceRepository {
    fn load_snapshots(&self) -> Result<Vec<PriceSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = price_data::table
            .select(PriceDataDB::as_select())
            .order(price_data::symbol.asc())
            .load::<PriceDataDB>(&mut conn)
            .into_core()?;
        rows.into_iter()
            .map(|row| PriceSnapshot::try_from(row).map_err(Into::into))
            .collect()
    }

    fn get_snapshot(&self, symbol: &str) -> Result<Option<PriceSnapshot>> {
        let mut conn = get_connection(&self.pool)?;
        let row = price_data::table
            .find(symbol)
            .select(PriceDataDB::as_select())
            .first::<PriceDataDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(PriceSnapshot::try_from).transpose()?)
    }

    fn latest_cycle_id(&self) -> Result<Option<i64>> {
        let mut conn = get_connection(&self.pool)?;
        price_data::table
            .select(max(price_data::cycle_id))
            .first::<Option<i64>>(&mut conn)
            .into_core()
    }

    async fn replace_snapshots(&self, snapshots: Vec<PriceSnapshot>) -> Result<PriceWriteSummary> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PriceWriteSummary> {
                let tracked: HashSet<String> = watchlist::table
                    .select(watchlist::symbol)
                    .load::<String>(conn)
                    .map_err(StorageError::from)?
                    .into_iter()
                    .collect();

                let purged = diesel::delete(price_data::table.filter(not(
                    price_data::symbol.eq_any(watchlist::table.select(watchlist::symbol)),
                )))
                .execute(conn)
                .map_err(StorageError::from)?;

                let mut summary = PriceWriteSummary {
                    purged,
                    ..PriceWriteSummary::default()
                };

                for snapshot in &snapshots {
                    if !tracked.contains(&snapshot.symbol) {
                        debug!("Skipping price for {}: no longer on the watchlist", snapshot.symbol);
                        summary.skipped += 1;
                        continue;
                    }
                    let row = PriceDataDB::from(snapshot);
                    diesel::insert_into(price_data::table)
                        .values(&row)
                        .on_conflict(price_data::symbol)
                        .do_update()
                        .set(&row)
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    summary.written += 1;
                }

                Ok(summary)
            })
            .await
    }
}
