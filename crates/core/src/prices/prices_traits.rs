use crate::errors::Result;
use crate::prices::prices_model::{PriceSnapshot, PriceWriteSummary};
use async_trait::async_trait;

/// Trait for price snapshot storage.
///
/// The refresh loop is the only writer.
#[async_trait]
pub trait PriceRepositoryTrait: Send + Sync {
    fn load_snapshots(&self) -> Result<Vec<PriceSnapshot>>;

    fn get_snapshot(&self, symbol: &str) -> Result<Option<PriceSnapshot>>;

    /// Highest cycle id present in the table, if any.
    fn latest_cycle_id(&self) -> Result<Option<i64>>;

    /// Replaces the price table with one cycle's results, in one transaction.
    ///
    /// Contract:
    /// - Snapshots whose symbol is not on the watchlist at commit time are skipped
    /// - Rows whose symbol is not on the watchlist are deleted
    /// - Rows for watchlist symbols missing from `snapshots` are left untouched
    /// - On error nothing is written
    async fn replace_snapshots(&self, snapshots: Vec<PriceSnapshot>) -> Result<PriceWriteSummary>;
}
