//! Sync metadata: last completed pass per owner.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::SqliteConnection;
use serde::{Deserialize, Serialize};

use moneta_core::errors::Result;
use moneta_core::records::OwnerId;
use moneta_core::sync::SyncStateStore;

use crate::codec::{timestamp_from_db, timestamp_to_db};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::schema::sync_state;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(primary_key(owner_id))]
#[diesel(table_name = crate::schema::sync_state)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct SyncStateDB {
    pub owner_id: String,
    pub last_synced_at: String,
}

pub struct SyncStateRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl SyncStateRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl SyncStateStore for SyncStateRepository {
    async fn last_completed_pass(&self, owner: &OwnerId) -> Result<Option<DateTime<Utc>>> {
        let mut conn = get_connection(&self.pool)?;
        let row = sync_state::table
            .find(owner.as_str())
            .first::<SyncStateDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(|r| timestamp_from_db(&r.last_synced_at)).transpose()
    }

    async fn record_completed_pass(&self, owner: &OwnerId, at: DateTime<Utc>) -> Result<()> {
        let row = SyncStateDB {
            owner_id: owner.as_str().to_string(),
            last_synced_at: timestamp_to_db(&at),
        };
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                diesel::insert_into(sync_state::table)
                    .values(&row)
                    .on_conflict(sync_state::owner_id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}
