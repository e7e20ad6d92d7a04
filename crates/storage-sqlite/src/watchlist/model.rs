//! Database model for the `watchlist` table.

use diesel::prelude::*;
use ibdash_core::watchlist::{NewWatchlistEntry, WatchlistEntry, WatchlistItem};

use crate::errors::StorageError;
use crate::prices::PriceDataDB;
use crate::utils::{from_db_timestamp, to_db_timestamp};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::watchlist)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WatchlistEntryDB {
    pub symbol: String,
    pub name: String,
    pub added_at: String,
}

impl TryFrom<WatchlistEntryDB> for WatchlistEntry {
    type Error = StorageError;

    fn try_from(db: WatchlistEntryDB) -> Result<Self, Self::Error> {
        Ok(Self {
            added_at: from_db_timestamp(&db.added_at)?,
            symbol: db.symbol,
            name: db.name,
        })
    }
}

impl From<NewWatchlistEntry> for WatchlistEntryDB {
    fn from(domain: NewWatchlistEntry) -> Self {
        Self {
            added_at: to_db_timestamp(&domain.added_at),
            symbol: domain.symbol,
            name: domain.name,
        }
    }
}

/// Builds the joined read model from a watchlist row and its optional price row.
pub(crate) fn to_item(
    entry: WatchlistEntryDB,
    price: Option<PriceDataDB>,
) -> Result<WatchlistItem, StorageError> {
    let entry = WatchlistEntry::try_from(entry)?;
    let mut item = WatchlistItem {
        symbol: entry.symbol,
        name: entry.name,
        added_at: entry.added_at,
        price: None,
        change: None,
        change_pct: None,
        volume: None,
        source: None,
        observed_at: None,
    };

    if let Some(row) = price {
        item.source = Some(row.parsed_source()?);
        item.observed_at = Some(from_db_timestamp(&row.observed_at)?);
        item.price = Some(row.price);
        item.change = Some(row.change);
        item.change_pct = Some(row.change_pct);
        item.volume = Some(row.volume);
    }

    Ok(item)
}
