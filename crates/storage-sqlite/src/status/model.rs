//! Database model for the `refresh_status` table.

use diesel::prelude::*;
use ibdash_core::status::{RefreshState, RefreshStatus};

use crate::errors::StorageError;
use crate::utils::{from_db_timestamp, from_db_timestamp_opt, to_db_timestamp};

pub const STATUS_ROW_ID: i32 = 1;

#[derive(Queryable, Selectable, Insertable, AsChangeset, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::refresh_status)]
#[diesel(treat_none_as_null = true)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct RefreshStatusDB {
    pub id: i32,
    pub state: String,
    pub connected: bool,
    pub last_cycle_id: Option<i64>,
    pub last_attempt_at: Option<String>,
    pub last_successful_cycle_at: Option<String>,
    pub consecutive_connect_failures: i32,
    pub restarts: i32,
    pub last_error: Option<String>,
    pub updated_at: String,
}

impl TryFrom<RefreshStatusDB> for RefreshStatus {
    type Error = StorageError;

    fn try_from(db: RefreshStatusDB) -> Result<Self, Self::Error> {
        Ok(Self {
            state: db
                .state
                .parse::<RefreshState>()
                .map_err(StorageError::InvalidValue)?,
            connected: db.connected,
            last_cycle_id: db.last_cycle_id,
            last_attempt_at: from_db_timestamp_opt(db.last_attempt_at.as_deref())?,
            last_successful_cycle_at: from_db_timestamp_opt(
                db.last_successful_cycle_at.as_deref(),
            )?,
            consecutive_connect_failures: u32::try_from(db.consecutive_connect_failures)
                .unwrap_or_default(),
            restarts: u32::try_from(db.restarts).unwrap_or_default(),
            last_error: db.last_error,
            updated_at: from_db_timestamp(&db.updated_at)?,
        })
    }
}

impl From<&RefreshStatus> for RefreshStatusDB {
    fn from(domain: &RefreshStatus) -> Self {
        Self {
            id: STATUS_ROW_ID,
            state: domain.state.as_str().to_string(),
            connected: domain.connected,
            last_cycle_id: domain.last_cycle_id,
            last_attempt_at: domain.last_attempt_at.as_ref().map(to_db_timestamp),
            last_successful_cycle_at: domain.last_successful_cycle_at.as_ref().map(to_db_timestamp),
            consecutive_connect_failures: i32::try_from(domain.consecutive_connect_failures)
                .unwrap_or(i32::MAX),
            restarts: i32::try_from(domain.restarts).unwrap_or(i32::MAX),
            last_error: domain.last_error.clone(),
            updated_at: to_db_timestamp(&domain.updated_at),
        }
    }
}
