//! Database model for the `price_data` table.

use diesel::prelude::*;
use ibdash_core::prices::{PriceSnapshot, PriceSource};

use crate::errors::StorageError;
use crate::utils::{from_db_timestamp, to_db_timestamp};

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::price_data)]
#[diesel(primary_key(symbol))]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceDataDB {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_pct: f64,
    pub volume: i64,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub close_price: Option<f64>,
    pub source: String,
    pub observed_at: String,
    pub cycle_id: i64,
}

impl PriceDataDB {
    pub fn parsed_source(&self) -> Result<PriceSource, StorageError> {
        self.source
            .parse::<PriceSource>()
            .map_err(StorageError::InvalidValue)
    }
}

impl TryFrom<PriceDataDB> for PriceSnapshot {
    type Error = StorageError;

    fn try_from(db: PriceDataDB) -> Result<Self, Self::Error> {
        let source = db.parsed_source()?;
        let observed_at = from_db_timestamp(&db.observed_at)?;
        Ok(Self {
            symbol: db.symbol,
            price: db.price,
            change: db.change,
            change_pct: db.change_pct,
            volume: db.volume,
            bid: db.bid,
            ask: db.ask,
            close_price: db.close_price,
            source,
            observed_at,
            cycle_id: db.cycle_id,
        })
    }
}

impl From<&PriceSnapshot> for PriceDataDB {
    fn from(domain: &PriceSnapshot) -> Self {
        Self {
            symbol: domain.symbol.clone(),
            price: domain.price,
            change: domain.change,
            change_pct: domain.change_pct,
            volume: domain.volume,
            bid: domain.bid,
            ask: domain.ask,
            close_price: domain.close_price,
            source: domain.source.as_str().to_string(),
            observed_at: to_db_timestamp(&domain.observed_at),
            cycle_id: domain.cycle_id,
        }
    }
}
