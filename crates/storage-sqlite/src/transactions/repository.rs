//! Transaction repository: local edit API plus the sync engine's store port.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;

use moneta_core::errors::Result;
use moneta_core::ids::RecordId;
use moneta_core::records::{
    EntityKind, OwnerId, SyncEnvelope, SyncStatus, Syncable, Transaction, TransactionFields,
};
use moneta_core::sync::{RecordFilter, RecordStore};

use super::model::TransactionDB;
use crate::codec::enum_to_db;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::observe::{spawn_live_query, ChangeBus, Live};
use crate::schema::transactions;

pub struct TransactionRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    bus: ChangeBus,
}

impl TransactionRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, bus: ChangeBus) -> Self {
        Self { pool, writer, bus }
    }

    /// Create a record locally. It stays `pending` under a temporary id
    /// until the next sync pass pushes it.
    pub async fn insert_new(
        &self,
        owner: &OwnerId,
        fields: TransactionFields,
    ) -> Result<Transaction> {
        let record = Transaction::from_parts(SyncEnvelope::new_local(owner.clone()), fields);
        let row = TransactionDB::try_from(&record)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                diesel::insert_into(transactions::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::Transaction, owner);
        Ok(record)
    }

    /// Apply a local edit; the row flips back to `pending`.
    pub async fn update(&self, mut record: Transaction) -> Result<Transaction> {
        record.envelope.mark_edited();
        self.put(&record).await?;
        Ok(record)
    }

    /// Delete a record locally. Rows with a temporary id are purged on the
    /// spot (they never left the device); confirmed rows are tombstoned
    /// until the remote deletion goes through.
    pub async fn remove(&self, id: &RecordId) -> Result<()> {
        let id_owned = id.as_str().to_string();
        let purge_immediately = id.is_temporary();
        let touched_owner = self
            .writer
            .exec(move |conn: &mut SqliteConnection| {
                let existing = transactions::table
                    .find(&id_owned)
                    .first::<TransactionDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                let Some(row) = existing else {
                    return Ok(None);
                };
                if purge_immediately {
                    diesel::delete(transactions::table.find(&id_owned))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    return Ok(Some(row.owner_id));
                }
                let mut record = Transaction::try_from(row)?;
                record.envelope.mark_deleted();
                let updated = TransactionDB::try_from(&record)?;
                diesel::update(transactions::table.find(&id_owned))
                    .set(&updated)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(Some(updated.owner_id))
            })
            .await?;
        if let Some(owner_id) = touched_owner {
            self.bus
                .publish(EntityKind::Transaction, &OwnerId::from(owner_id));
        }
        Ok(())
    }

    /// Reactive view over the owner's live (non-deleted) transactions,
    /// newest date first.
    pub fn watch_by_owner(&self, owner: &OwnerId) -> Live<Transaction> {
        let pool = Arc::clone(&self.pool);
        let load_owner = owner.clone();
        spawn_live_query(
            &self.bus,
            EntityKind::Transaction,
            owner.clone(),
            move || load_live(&pool, &load_owner),
        )
    }
}

fn load_live(pool: &DbPool, owner: &OwnerId) -> Result<Vec<Transaction>> {
    let mut conn = get_connection(pool)?;
    let rows = transactions::table
        .filter(transactions::owner_id.eq(owner.as_str()))
        .filter(transactions::is_deleted.eq(false))
        .order((transactions::date.desc(), transactions::id.asc()))
        .load::<TransactionDB>(&mut conn)
        .map_err(StorageError::from)?;
    rows.into_iter().map(Transaction::try_from).collect()
}

#[async_trait]
impl RecordStore<Transaction> for TransactionRepository {
    async fn get(&self, id: &RecordId) -> Result<Option<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let row = transactions::table
            .find(id.as_str())
            .first::<TransactionDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(Transaction::try_from).transpose()
    }

    async fn put(&self, record: &Transaction) -> Result<()> {
        let row = TransactionDB::try_from(record)?;
        let owner = record.envelope.owner_id.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                diesel::insert_into(transactions::table)
                    .values(&row)
                    .on_conflict(transactions::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::Transaction, &owner);
        Ok(())
    }

    async fn replace(&self, old_id: &RecordId, record: &Transaction) -> Result<()> {
        let row = TransactionDB::try_from(record)?;
        let old = old_id.as_str().to_string();
        let owner = record.envelope.owner_id.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                conn.transaction::<_, diesel::result::Error, _>(|conn| {
                    diesel::delete(transactions::table.find(&old)).execute(conn)?;
                    diesel::insert_into(transactions::table)
                        .values(&row)
                        .on_conflict(transactions::id)
                        .do_update()
                        .set(&row)
                        .execute(conn)?;
                    Ok(())
                })
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::Transaction, &owner);
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let id_owned = id.as_str().to_string();
        let touched_owner = self
            .writer
            .exec(move |conn: &mut SqliteConnection| {
                let owner = transactions::table
                    .find(&id_owned)
                    .select(transactions::owner_id)
                    .first::<String>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                if owner.is_some() {
                    diesel::delete(transactions::table.find(&id_owned))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(owner)
            })
            .await?;
        if let Some(owner_id) = touched_owner {
            self.bus
                .publish(EntityKind::Transaction, &OwnerId::from(owner_id));
        }
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner: &OwnerId,
        filter: RecordFilter,
    ) -> Result<Vec<Transaction>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = transactions::table
            .filter(transactions::owner_id.eq(owner.as_str()))
            .into_boxed();
        match filter {
            RecordFilter::All => {}
            RecordFilter::Live => {
                query = query.filter(transactions::is_deleted.eq(false));
            }
            RecordFilter::PendingLive => {
                query = query
                    .filter(transactions::sync_status.eq(enum_to_db(&SyncStatus::Pending)?))
                    .filter(transactions::is_deleted.eq(false));
            }
            RecordFilter::Tombstoned => {
                query = query.filter(transactions::is_deleted.eq(true));
            }
        }
        let rows = query
            .order(transactions::id.asc())
            .load::<TransactionDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(Transaction::try_from).collect()
    }
}
