//! Row shape shared by `account_cache` and `portfolio_cache`.

use diesel::prelude::*;
use ibdash_core::cache::{CacheKind, CachedPayload};

use crate::errors::StorageError;
use crate::utils::from_db_timestamp;

/// Both cache tables hold a single row with `id = 1`.
pub const CACHE_ROW_ID: i32 = 1;

#[derive(Queryable, Debug, Clone, PartialEq)]
pub struct CacheRowDB {
    pub id: i32,
    pub payload: String,
    pub fetched_at: String,
    pub is_stale: bool,
}

impl CacheRowDB {
    pub fn into_domain(self, kind: CacheKind) -> Result<CachedPayload, StorageError> {
        Ok(CachedPayload {
            kind,
            payload: serde_json::from_str(&self.payload)?,
            fetched_at: from_db_timestamp(&self.fetched_at)?,
            is_stale: self.is_stale,
        })
    }
}
