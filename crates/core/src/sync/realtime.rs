//! Realtime merge handler.
//!
//! Applies server-pushed change notifications to the local store as they
//! arrive, so the device converges between full sync passes. Delivery is
//! at-least-once and unordered relative to our own writes; both are
//! tolerated here: re-applied inserts/updates are idempotent upserts and
//! re-applied deletes are no-ops.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ids::RecordId;
use crate::records::{
    Debt, EntityKind, InvestmentGoal, OwnerId, SyncEnvelope, SyncStatus, Syncable, Transaction,
};

use super::ports::{RecordFilter, RecordStore, RemoteRow};

/// Operation carried by a change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// One server-originated change notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub kind: EntityKind,
    pub op: ChangeOp,
    /// Row payload as sent by the backend. Insert/update events carry the
    /// full row; delete events carry at least `id` and `ownerId`.
    pub row: serde_json::Value,
}

/// What the handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Applied,
    Discarded(&'static str),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletePayload {
    id: String,
    owner_id: OwnerId,
}

/// Applies change events for one owner against the local stores.
pub struct RealtimeMergeHandler {
    owner: OwnerId,
    transactions: Arc<dyn RecordStore<Transaction>>,
    debts: Arc<dyn RecordStore<Debt>>,
    investment_goals: Arc<dyn RecordStore<InvestmentGoal>>,
}

impl RealtimeMergeHandler {
    pub fn new(
        owner: OwnerId,
        transactions: Arc<dyn RecordStore<Transaction>>,
        debts: Arc<dyn RecordStore<Debt>>,
        investment_goals: Arc<dyn RecordStore<InvestmentGoal>>,
    ) -> Self {
        Self {
            owner,
            transactions,
            debts,
            investment_goals,
        }
    }

    /// Consume a change feed until it ends. Per-event failures are logged
    /// and do not tear the subscription down.
    pub async fn run<S>(&self, stream: S)
    where
        S: Stream<Item = ChangeEvent> + Send,
    {
        futures::pin_mut!(stream);
        while let Some(event) = stream.next().await {
            match self.apply(&event).await {
                Ok(MergeOutcome::Applied) => {}
                Ok(MergeOutcome::Discarded(reason)) => {
                    debug!(
                        "[Realtime] discarded {:?} event for {}: {}",
                        event.op, event.kind, reason
                    );
                }
                Err(err) => {
                    warn!(
                        "[Realtime] failed to apply {:?} event for {}: {}",
                        event.op, event.kind, err
                    );
                }
            }
        }
        info!("[Realtime] change feed closed for owner {}", self.owner);
    }

    /// Apply a single event.
    pub async fn apply(&self, event: &ChangeEvent) -> Result<MergeOutcome> {
        match event.kind {
            EntityKind::Transaction => self.apply_for(&self.transactions, event).await,
            EntityKind::Debt => self.apply_for(&self.debts, event).await,
            EntityKind::InvestmentGoal => self.apply_for(&self.investment_goals, event).await,
        }
    }

    async fn apply_for<T: Syncable>(
        &self,
        store: &Arc<dyn RecordStore<T>>,
        event: &ChangeEvent,
    ) -> Result<MergeOutcome> {
        match event.op {
            ChangeOp::Insert | ChangeOp::Update => self.apply_upsert(store, event).await,
            ChangeOp::Delete => self.apply_delete(store, event).await,
        }
    }

    async fn apply_upsert<T: Syncable>(
        &self,
        store: &Arc<dyn RecordStore<T>>,
        event: &ChangeEvent,
    ) -> Result<MergeOutcome> {
        let row: RemoteRow<T::Fields> = serde_json::from_value(event.row.clone())?;
        if row.owner_id != self.owner {
            return Ok(MergeOutcome::Discarded("event for a different owner"));
        }

        let id = RecordId::from(row.id.clone());
        if let Some(existing) = store.get(&id).await? {
            if existing.envelope().sync_status != SyncStatus::Synced {
                // An unconfirmed local edit takes precedence; the next sync
                // pass reconciles.
                return Ok(MergeOutcome::Discarded("local row has a pending edit"));
            }
            let mut envelope = existing.envelope().clone();
            envelope.absorb_remote(row.updated_at);
            store.put(&T::from_parts(envelope, row.fields)).await?;
            return Ok(MergeOutcome::Applied);
        }

        // Duplicate-from-local-creation check: the event is almost certainly
        // the server's confirmation of a record this device is about to push
        // itself; accepting it would yield a second row once the push runs.
        let incoming_key = T::natural_key(&row.fields);
        let pending = store
            .list_by_owner(&self.owner, RecordFilter::PendingLive)
            .await?;
        let locally_created = pending.iter().any(|record| {
            record.envelope().id.is_temporary()
                && T::natural_key(&record.fields()) == incoming_key
        });
        if locally_created {
            return Ok(MergeOutcome::Discarded(
                "matches a pending locally created record",
            ));
        }

        let envelope = SyncEnvelope::from_remote(id, row.owner_id, row.updated_at);
        store.put(&T::from_parts(envelope, row.fields)).await?;
        Ok(MergeOutcome::Applied)
    }

    async fn apply_delete<T: Syncable>(
        &self,
        store: &Arc<dyn RecordStore<T>>,
        event: &ChangeEvent,
    ) -> Result<MergeOutcome> {
        let payload: DeletePayload = serde_json::from_value(event.row.clone())?;
        if payload.owner_id != self.owner {
            return Ok(MergeOutcome::Discarded("event for a different owner"));
        }

        let id = RecordId::from(payload.id);
        let Some(existing) = store.get(&id).await? else {
            return Ok(MergeOutcome::Discarded("no local row"));
        };

        let env = existing.envelope();
        if env.sync_status == SyncStatus::Pending && !env.is_deleted {
            // The user is mid-edit; their pending write is allowed to
            // resurrect the row. The next push restates its existence.
            return Ok(MergeOutcome::Discarded("local row has a pending edit"));
        }

        store.delete(&id).await?;
        Ok(MergeOutcome::Applied)
    }
}
