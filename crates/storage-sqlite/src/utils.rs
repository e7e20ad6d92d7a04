//! Helpers shared by the repositories.

use chrono::{DateTime, Utc};

use crate::errors::StorageError;

/// Symbols per `IN (...)` clause; stays well below SQLite's bound-parameter limit.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Splits `items` into slices small enough for one `IN (...)` clause.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

/// Timestamps are stored as RFC 3339 text.
pub fn to_db_timestamp(value: &DateTime<Utc>) -> String {
    value.to_rfc3339()
}

pub fn from_db_timestamp(value: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidValue(format!("timestamp '{}': {}", value, e)))
}

pub fn from_db_timestamp_opt(value: Option<&str>) -> Result<Option<DateTime<Utc>>, StorageError> {
    value.map(from_db_timestamp).transpose()
}
