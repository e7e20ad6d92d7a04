use crate::cache::cache_model::{CacheKind, CachedPayload};
use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Trait for the account/portfolio cache rows
#[async_trait]
pub trait CacheRepositoryTrait: Send + Sync {
    fn get_cache(&self, kind: CacheKind) -> Result<Option<CachedPayload>>;

    /// Overwrites the row for `kind` wholesale and clears the stale flag.
    async fn put_cache(
        &self,
        kind: CacheKind,
        payload: serde_json::Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Flags the existing row as stale. Returns false when there is no row yet.
    async fn mark_cache_stale(&self, kind: CacheKind) -> Result<bool>;
}
