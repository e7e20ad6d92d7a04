//! SQLite storage implementation for the IB dashboard data server.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `ibdash-core`:
//! - Database connection pooling and migrations
//! - The single writer actor
//! - Repository implementations for the watchlist, prices, caches and status
//!
//! ```text
//! web layer         refresh loop
//!     │                  │
//!     └────────┬─────────┘
//!              ▼
//!      storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB (WAL)
//! ```

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod cache;
pub mod prices;
pub mod status;
pub mod watchlist;

pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

pub use errors::{IntoCore, StorageError};

pub use cache::CacheRepository;
pub use prices::PriceRepository;
pub use status::StatusRepository;
pub use watchlist::WatchlistRepository;

// Re-export from ibdash-core for convenience
pub use ibdash_core::errors::{DatabaseError, Error, Result};
