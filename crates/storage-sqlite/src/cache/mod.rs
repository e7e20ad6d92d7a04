//! SQLite storage implementation for the account and portfolio caches.

mod model;
mod repository;

pub use model::CacheRowDB;
pub use repository::CacheRepository;
