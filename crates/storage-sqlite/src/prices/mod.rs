//! SQLite storage implementation for price snapshots.

mod model;
mod repository;

pub use model::PriceDataDB;
pub use repository::PriceRepository;
