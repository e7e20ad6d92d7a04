use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;

use ibdash_core::cache::{CacheKind, CacheRepositoryTrait, CachedPayload};
use ibdash_core::Result;

use super::model::{CacheRowDB, CACHE_ROW_ID};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::{account_cache, portfolio_cache};
use crate::utils::to_db_timestamp;

pub struct CacheRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CacheRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        CacheRepository { pool, writer }
    }
}

#[async_trait]
impl CacheRepositoryTrait for CacheRepository {
    fn get_cache(&self, kind: CacheKind) -> Result<Option<CachedPayload>> {
        let mut conn = get_connection(&self.pool)?;
        let row = match kind {
            CacheKind::Account => account_cache::table
                .find(CACHE_ROW_ID)
                .first::<CacheRowDB>(&mut conn)
                .optional(),
            CacheKind::Portfolio => portfolio_cache::table
                .find(CACHE_ROW_ID)
                .first::<CacheRowDB>(&mut conn)
                .optional(),
        }
        .into_core()?;
        Ok(row.map(|r| r.into_domain(kind)).transpose()?)
    }

    async fn put_cache(
        &self,
        kind: CacheKind,
        payload: serde_json::Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<()> {
        let payload = serde_json::to_string(&payload)?;
        let fetched_at = to_db_timestamp(&fetched_at);

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                let written = match kind {
                    CacheKind::Account => diesel::insert_into(account_cache::table)
                        .values((
                            account_cache::id.eq(CACHE_ROW_ID),
                            account_cache::payload.eq(&payload),
                            account_cache::fetched_at.eq(&fetched_at),
                            account_cache::is_stale.eq(false),
                        ))
                        .on_conflict(account_cache::id)
                        .do_update()
                        .set((
                            account_cache::payload.eq(&payload),
                            account_cache::fetched_at.eq(&fetched_at),
                            account_cache::is_stale.eq(false),
                        ))
                        .execute(conn),
                    CacheKind::Portfolio => diesel::insert_into(portfolio_cache::table)
                        .values((
                            portfolio_cache::id.eq(CACHE_ROW_ID),
                            portfolio_cache::payload.eq(&payload),
                            portfolio_cache::fetched_at.eq(&fetched_at),
                            portfolio_cache::is_stale.eq(false),
                        ))
                        .on_conflict(portfolio_cache::id)
                        .do_update()
                        .set((
                            portfolio_cache::payload.eq(&payload),
                            portfolio_cache::fetched_at.eq(&fetched_at),
                            portfolio_cache::is_stale.eq(false),
                        ))
                        .execute(conn),
                };
                written.map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn mark_cache_stale(&self, kind: CacheKind) -> Result<bool> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<bool> {
                let updated = match kind {
                    CacheKind::Account => {
                        diesel::update(account_cache::table.find(CACHE_ROW_ID))
                            .set(account_cache::is_stale.eq(true))
                            .execute(conn)
                    }
                    CacheKind::Portfolio => {
                        diesel::update(portfolio_cache::table.find(CACHE_ROW_ID))
                            .set(portfolio_cache::is_stale.eq(true))
                            .execute(conn)
                    }
                }
                .map_err(StorageError::from)?;
                Ok(updated > 0)
            })
            .await
    }
}
