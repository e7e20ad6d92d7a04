//! Price snapshots - one current row per watchlist symbol.

mod prices_model;
mod prices_traits;

pub use prices_model::{PriceSnapshot, PriceSource, PriceWriteSummary};
pub use prices_traits::PriceRepositoryTrait;
