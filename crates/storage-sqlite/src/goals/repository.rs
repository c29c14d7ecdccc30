//! Investment goal repository.

use std::sync::Arc;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::SqliteConnection;

use moneta_core::errors::Result;
use moneta_core::ids::RecordId;
use moneta_core::records::{
    EntityKind, InvestmentGoal, InvestmentGoalFields, OwnerId, SyncEnvelope, SyncStatus, Syncable,
};
use moneta_core::sync::{RecordFilter, RecordStore};

use super::model::InvestmentGoalDB;
use crate::codec::enum_to_db;
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::observe::{spawn_live_query, ChangeBus, Live};
use crate::schema::investment_goals;

pub struct InvestmentGoalRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
    bus: ChangeBus,
}

impl InvestmentGoalRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle, bus: ChangeBus) -> Self {
        Self { pool, writer, bus }
    }

    pub async fn insert_new(
        &self,
        owner: &OwnerId,
        fields: InvestmentGoalFields,
    ) -> Result<InvestmentGoal> {
        let record = InvestmentGoal::from_parts(SyncEnvelope::new_local(owner.clone()), fields);
        let row = InvestmentGoalDB::try_from(&record)?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                diesel::insert_into(investment_goals::table)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::InvestmentGoal, owner);
        Ok(record)
    }

    pub async fn update(&self, mut record: InvestmentGoal) -> Result<InvestmentGoal> {
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
                let existing = investment_goals::table
                    .find(&id_owned)
                    .first::<InvestmentGoalDB>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                let Some(row) = existing else {
                    return Ok(None);
                };
                if purge_immediately {
                    diesel::delete(investment_goals::table.find(&id_owned))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                    return Ok(Some(row.owner_id));
                }
                let mut record = InvestmentGoal::try_from(row)?;
                record.envelope.mark_deleted();
                let updated = InvestmentGoalDB::try_from(&record)?;
                diesel::update(investment_goals::table.find(&id_owned))
                    .set(&updated)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(Some(updated.owner_id))
            })
            .await?;
        if let Some(owner_id) = touched_owner {
            self.bus
                .publish(EntityKind::InvestmentGoal, &OwnerId::from(owner_id));
        }
        Ok(())
    }

    /// Reactive view over the owner's live goals, by name.
    pub fn watch_by_owner(&self, owner: &OwnerId) -> Live<InvestmentGoal> {
        let pool = Arc::clone(&self.pool);
        let load_owner = owner.clone();
        spawn_live_query(
            &self.bus,
            EntityKind::InvestmentGoal,
            owner.clone(),
            move || load_live(&pool, &load_owner),
        )
    }
}

fn load_live(pool: &DbPool, owner: &OwnerId) -> Result<Vec<InvestmentGoal>> {
    let mut conn = get_connection(pool)?;
    let rows = investment_goals::table
        .filter(investment_goals::owner_id.eq(owner.as_str()))
        .filter(investment_goals::is_deleted.eq(false))
        .order((investment_goals::name.asc(), investment_goals::id.asc()))
        .load::<InvestmentGoalDB>(&mut conn)
        .map_err(StorageError::from)?;
    rows.into_iter().map(InvestmentGoal::try_from).collect()
}

#[async_trait]
impl RecordStore<InvestmentGoal> for InvestmentGoalRepository {
    async fn get(&self, id: &RecordId) -> Result<Option<InvestmentGoal>> {
        let mut conn = get_connection(&self.pool)?;
        let row = investment_goals::table
            .find(id.as_str())
            .first::<InvestmentGoalDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(InvestmentGoal::try_from).transpose()
    }

    async fn put(&self, record: &InvestmentGoal) -> Result<()> {
        let row = InvestmentGoalDB::try_from(record)?;
        let owner = record.envelope.owner_id.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                diesel::insert_into(investment_goals::table)
                    .values(&row)
                    .on_conflict(investment_goals::id)
                    .do_update()
                    .set(&row)
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::InvestmentGoal, &owner);
        Ok(())
    }

    async fn replace(&self, old_id: &RecordId, record: &InvestmentGoal) -> Result<()> {
        let row = InvestmentGoalDB::try_from(record)?;
        let old = old_id.as_str().to_string();
        let owner = record.envelope.owner_id.clone();
        self.writer
            .exec(move |conn: &mut SqliteConnection| {
                conn.transaction::<_, diesel::result::Error, _>(|conn| {
                    diesel::delete(investment_goals::table.find(&old)).execute(conn)?;
                    diesel::insert_into(investment_goals::table)
                        .values(&row)
                        .on_conflict(investment_goals::id)
                        .do_update()
                        .set(&row)
                        .execute(conn)?;
                    Ok(())
                })
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await?;
        self.bus.publish(EntityKind::InvestmentGoal, &owner);
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<()> {
        let id_owned = id.as_str().to_string();
        let touched_owner = self
            .writer
            .exec(move |conn: &mut SqliteConnection| {
                let owner = investment_goals::table
                    .find(&id_owned)
                    .select(investment_goals::owner_id)
                    .first::<String>(conn)
                    .optional()
                    .map_err(StorageError::from)?;
                if owner.is_some() {
                    diesel::delete(investment_goals::table.find(&id_owned))
                        .execute(conn)
                        .map_err(StorageError::from)?;
                }
                Ok(owner)
            })
            .await?;
        if let Some(owner_id) = touched_owner {
            self.bus
                .publish(EntityKind::InvestmentGoal, &OwnerId::from(owner_id));
        }
        Ok(())
    }

    async fn list_by_owner(
        &self,
        owner: &OwnerId,
        filter: RecordFilter,
    ) -> Result<Vec<InvestmentGoal>> {
        let mut conn = get_connection(&self.pool)?;
        let mut query = investment_goals::table
            .filter(investment_goals::owner_id.eq(owner.as_str()))
            .into_boxed();
        match filter {
            RecordFilter::All => {}
            RecordFilter::Live => {
                query = query.filter(investment_goals::is_deleted.eq(false));
            }
            RecordFilter::PendingLive => {
                query = query
                    .filter(investment_goals::sync_status.eq(enum_to_db(&SyncStatus::Pending)?))
                    .filter(investment_goals::is_deleted.eq(false));
            }
            RecordFilter::Tombstoned => {
                query = query.filter(investment_goals::is_deleted.eq(true));
            }
        }
        let rows = query
            .order(investment_goals::id.asc())
            .load::<InvestmentGoalDB>(&mut conn)
            .map_err(StorageError::from)?;
        rows.into_iter().map(InvestmentGoal::try_from).collect()
    }
}
