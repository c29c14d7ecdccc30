//! Debt repository.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;

use moneta_core::errors::Result;
use moneta_core::ids::RecordId;
use moneta_core::records::{Debt, DebtFields, EntityKind, OwnerId, SyncEnvelope, SyncStatus, Syncable};
use moneta_core::sync::{RecordFilter, RecordStore};

use super::model::DebtDB;
use crate::codec::enum_to_db;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::observe::{spawn_live_query, ChangeBus, Live};
use crate::schema::debts;

pub struct DebtRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    bus: ChangeBus,
}

impl DebtRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, bus: ChangeBus) -> Self {
        Self { pool, writer, bus }
    }

    pub async fn insert_new(&self, owner: &OwnerId, fields: DebtFields) -> Result<Debt> {
        let record = Debt::from_parts(SyncEnvelope::new_local(owner.clone()), fields);
        let row = DebtDB::try_from(&record)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                diesel::insert_into(debts::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::Debt, owner);
        Ok(record)
    }

    pub async fn update(&self, mut record: Debt) -> Result<Debt> {
        record.envelope.mark_edited();
        self.put(&record).await?;
        Ok(record)
    }

    pub async fn remove(&self, id: &RecordId) -> Result<()> {
        let id_owned = id.as_str().to_string();
        let purge_immediately = id.is_temporary();
        let touched_owner = self
            .writer
            .exec(move |conn: &mut SqliteConnection| {
                let existing = debts::table
                    .find(&id_owned)
                    .first::<DebtDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                let Some(row) = existing else {
                    return Ok(None);
                };
                if purge_immediately {
                    diesel::delete(debts::table.find(&id_owned))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    return Ok(Some(row.owner_id));
                }
                let mut record = Debt::try_from(row)?;
                record.envelope.mark_deleted();
                let updated = DebtDB::try_from(&record)?;
                diesel::update(debts::table.find(&id_owned))
                    .set(&updated)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(Some(updated.owner_id))
            })
            .await?;
        if let Some(owner_id) = touched_owner {
            self.bus.publish(EntityKind::Debt, &OwnerId::from(owner_id));
        }
        Ok(())
    }

    /// Reactive view over the owner's live debts, earliest due date first.
    pub fn watch_by_owner(&self, owner: &OwnerId) -> Live<Debt> {
        let pool = Arc::clone(&self.pool);
        let load_owner = owner.clone();
        spawn_live_query(&self.bus, EntityKind::Debt, owner.clone(), move || {
            load_live(&pool, &load_owner)
        })
    }
}

fn load_live(pool: &DbPool, owner: &OwnerId) -> Result<Vec<Debt>> {
    let mut conn = get_connection(pool)?;
    let rows = debts::table
        .filter(debts::owner_id.eq(owner.as_str()))
        .filter(debts::is_deleted.eq(false))
        .order((debts::due_date.asc(), debts::id.asc()))
        .load::<DebtDB>(&mut conn)
        .map_err(StorageError::from)?;
    rows.into_iter().map(Debt::try_from).collect()
}

#[async_trait]
impl RecordStore<Debt> for DebtRepository {
    async fn get(&self, id: &RecordId) -> Result<Option<Debt>> {
        let mut conn = get_connection(&self.pool)?;
        let row = debts::table
            .find(id.as_str())
            .first::<DebtDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(Debt::try_from).transpose()
    }

    async fn put(&self, record: &Debt) -> Result<()> {
        let row = DebtDB::try_from(record)?;
        let owner = record.envelope.owner_id.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                diesel::insert_into(debts::table)
                    .values(&row)
                    .on_conflict(debts::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::Debt, &owner);
        Ok(())
    }

    async fn replace(&self, old_id: &RecordId, record: &Debt) -> Result<()> {
        let row = DebtDB::try_from(record)?;
        let old = old_id.as_str().to_string();
        let owner = record.envelope.owner_id.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                conn.transaction::<_, diesel::result::Error, _>(|conn| {
                    diesel::delete(debts::table.find(&old)).execute(conn)?;
                    diesel::insert_into(debts::table)
                        .values(&row)
                        .on_conflict(debts::id)
                        .do_update()
                        .set(&row)
                        .execute(conn)?;
                    Ok(())
                })
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::Debt, &owner);
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let id_owned = id.as_str().to_string();
        let touched_owner = self
            .writer
            .exec(move |conn: &mut SqliteConnection| {
                let owner = debts::table
                    .find(&id_owned)
                    .select(debts::owner_id)
                    .first::<String>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                if owner.is_some() {
                    diesel::delete(debts::table.find(&id_owned))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(owner)
            })
            .await?;
        if let Some(owner_id) = touched_owner {
            self.bus.publish(EntityKind::Debt, &OwnerId::from(owner_id));
        }
        Ok(())
    }

    async fn list_by_owner(&self, owner: &OwnerId, filter: RecordFilter) -> Result<Vec<Debt>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = debts::table
            .filter(debts::owner_id.eq(owner.as_str()))
            .into_boxed();
        match filter {
            RecordFilter::All => {}
            RecordFilter::Live => {
                query = query.filter(debts::is_deleted.eq(false));
            }
            RecordFilter::PendingLive => {
                query = query
                    .filter(debts::sync_status.eq(enum_to_db(&SyncStatus::Pending)?))
                    .filter(debts::is_deleted.eq(false));
            }
            RecordFilter::Tombstoned => {
                query = query.filter(debts::is_deleted.eq(true));
            }
        }
        let rows = query
            .order(debts::id.asc())
            .load::<DebtDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(Debt::try_from).collect()
    }
}
