//! SQLite storage implementation for the refresh status row.

mod model;
mod repository;

pub use model::RefreshStatusDB;
pub use repository::StatusRepository;
