use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;

use ibdash_core::status::{RefreshStatus, StatusRepositoryTrait};
use ibdash_core::Result;

use super::model::{RefreshStatusDB, STATUS_ROW_ID};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::refresh_status;

pub struct StatusRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl StatusRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        StatusRepository { pool, writer }
    }
}

#[async_trait]
impl StatusRepositoryTrait for StatusRepository {
    fn load_status(&self) -> Result<Option<RefreshStatus>> {
        let mut conn = get_connection(&self.pool)?;
        let row = refresh_status::table
            .find(STATUS_ROW_ID)
            .select(RefreshStatusDB::as_select())
            .first::<RefreshStatusDB>(&mut conn)
            .optional()
            .into_core()?;
        Ok(row.map(RefreshStatus::try_from).transpose()?)
    }

    async fn save_status(&self, status: RefreshStatus) -> Result<()> {
        let row = RefreshStatusDB::from(&status);
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(refresh_status::table)
                    .values(&row)
                    .on_conflict(refresh_status::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
