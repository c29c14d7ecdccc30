//! Push/pull reconciliation engine.
//!
//! One pass runs push → deletion → pull for every entity kind, one kind at
//! a time. Failures are isolated per row; a row that fails stays `pending`
//! (or tombstoned) and is retried on the next pass. Overlapping passes are
//! rejected, not queued.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;

use crate::errors::{Error, RemoteError, Result};
use crate::ids::RecordId;
use crate::records::{
    Debt, EntityKind, InvestmentGoal, OwnerId, SyncEnvelope, SyncStatus, Syncable, Transaction,
};

use super::ports::{
    ConnectivityProbe, RecordFilter, RecordStore, RemoteCollection, RemoteRow, Session,
    SessionProvider, SyncStateStore,
};

/// One problem encountered during a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncIssue {
    pub kind: Option<EntityKind>,
    pub record_id: Option<String>,
    pub message: String,
}

impl SyncIssue {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            kind: None,
            record_id: None,
            message: message.into(),
        }
    }

    fn kind(kind: EntityKind, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            record_id: None,
            message: message.into(),
        }
    }

    fn record(kind: EntityKind, record_id: &RecordId, message: impl Into<String>) -> Self {
        Self {
            kind: Some(kind),
            record_id: Some(record_id.as_str().to_string()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SyncIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.kind, &self.record_id) {
            (Some(kind), Some(id)) => write!(f, "{} {}: {}", kind, id, self.message),
            (Some(kind), None) => write!(f, "{}: {}", kind, self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Per-kind outcome counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCounts {
    pub pushed: usize,
    pub deleted: usize,
    pub pulled: usize,
    pub purged: usize,
    pub failed: usize,
}

/// Outcome of one `sync_all` invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub succeeded: bool,
    pub transactions: KindCounts,
    pub debts: KindCounts,
    pub investment_goals: KindCounts,
    pub errors: Vec<SyncIssue>,
}

impl SyncReport {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            transactions: KindCounts::default(),
            debts: KindCounts::default(),
            investment_goals: KindCounts::default(),
            errors: vec![SyncIssue::pass(message)],
        }
    }

    pub fn counts(&self, kind: EntityKind) -> &KindCounts {
        match kind {
            EntityKind::Transaction => &self.transactions,
            EntityKind::Debt => &self.debts,
            EntityKind::InvestmentGoal => &self.investment_goals,
        }
    }

    fn summary(&self) -> String {
        let total = |pick: fn(&KindCounts) -> usize| {
            pick(&self.transactions) + pick(&self.debts) + pick(&self.investment_goals)
        };
        format!(
            "pushed={} deleted={} pulled={} purged={} errors={}",
            total(|c| c.pushed),
            total(|c| c.deleted),
            total(|c| c.pulled),
            total(|c| c.purged),
            self.errors.len()
        )
    }
}

/// Store and remote endpoints for one entity kind.
pub struct KindPorts<T: Syncable> {
    pub store: Arc<dyn RecordStore<T>>,
    pub remote: Arc<dyn RemoteCollection<T>>,
}

impl<T: Syncable> Clone for KindPorts<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            remote: Arc::clone(&self.remote),
        }
    }
}

/// Everything the engine needs at construction time.
pub struct EnginePorts {
    pub transactions: KindPorts<Transaction>,
    pub debts: KindPorts<Debt>,
    pub investment_goals: KindPorts<InvestmentGoal>,
    pub sync_state: Arc<dyn SyncStateStore>,
    pub connectivity: Arc<dyn ConnectivityProbe>,
    pub sessions: Arc<dyn SessionProvider>,
}

/// The single authority that reconciles pending local state with the
/// remote store, exactly one pass at a time.
pub struct SyncEngine {
    transactions: KindPorts<Transaction>,
    debts: KindPorts<Debt>,
    investment_goals: KindPorts<InvestmentGoal>,
    sync_state: Arc<dyn SyncStateStore>,
    connectivity: Arc<dyn ConnectivityProbe>,
    sessions: Arc<dyn SessionProvider>,
    in_flight: AtomicBool,
    state_tx: watch::Sender<bool>,
}

/// Clears the in-flight flag when the pass ends, panics included.
struct PassGuard<'a> {
    engine: &'a SyncEngine,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.engine.in_flight.store(false, Ordering::Release);
        self.engine.state_tx.send_replace(false);
    }
}

impl SyncEngine {
    pub fn new(ports: EnginePorts) -> Self {
        let (state_tx, _) = watch::channel(false);
        Self {
            transactions: ports.transactions,
            debts: ports.debts,
            investment_goals: ports.investment_goals,
            sync_state: ports.sync_state,
            connectivity: ports.connectivity,
            sessions: ports.sessions,
            in_flight: AtomicBool::new(false),
            state_tx,
        }
    }

    /// Whether a pass is currently running.
    pub fn is_syncing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Subscribe to in-flight state changes, e.g. for a UI badge.
    pub fn subscribe_state(&self) -> watch::Receiver<bool> {
        self.state_tx.subscribe()
    }

    /// Run one full pass for `owner`.
    ///
    /// Never fails at the signature level: preconditions, reentrancy and
    /// unexpected internal errors are all folded into the report so callers
    /// can invoke this opportunistically.
    pub async fn sync_all(&self, owner: &OwnerId) -> SyncReport {
        if !self.connectivity.is_online() {
            return SyncReport::rejected("device is offline");
        }
        match self.sessions.current_session() {
            None => return SyncReport::rejected("no active session"),
            Some(Session { owner_id }) if owner_id != *owner => {
                return SyncReport::rejected("active session does not belong to the requested owner")
            }
            Some(_) => {}
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("[Sync] rejecting overlapping pass for owner {}", owner);
            return SyncReport::rejected("a sync pass is already running");
        }
        let _guard = PassGuard { engine: self };
        self.state_tx.send_replace(true);

        info!("[Sync] starting pass for owner {}", owner);
        let mut errors = Vec::new();
        let transactions = sync_kind(&self.transactions, owner, &mut errors).await;
        let debts = sync_kind(&self.debts, owner, &mut errors).await;
        let investment_goals = sync_kind(&self.investment_goals, owner, &mut errors).await;

        // Recorded even after partial failure; failed rows stay pending and
        // are retried next pass.
        if let Err(err) = self.sync_state.record_completed_pass(owner, Utc::now()).await {
            errors.push(SyncIssue::pass(format!(
                "failed to record pass completion: {err}"
            )));
        }

        let report = SyncReport {
            succeeded: errors.is_empty(),
            transactions,
            debts,
            investment_goals,
            errors,
        };
        info!("[Sync] pass finished for owner {}: {}", owner, report.summary());
        report
    }
}

/// Push, deletion and pull for one kind. Each phase traps its own failures;
/// no phase aborts the ones after it.
async fn sync_kind<T: Syncable>(
    ports: &KindPorts<T>,
    owner: &OwnerId,
    errors: &mut Vec<SyncIssue>,
) -> KindCounts {
    let mut counts = KindCounts::default();

    // Push phase: pending rows that are still live.
    match ports.store.list_by_owner(owner, RecordFilter::PendingLive).await {
        Ok(pending) => {
            for record in pending {
                let record_id = record.envelope().id.clone();
                match push_record(ports, owner, record).await {
                    Ok(()) => counts.pushed += 1,
                    Err(err) => {
                        counts.failed += 1;
                        warn!("[Sync] push failed for {} {}: {}", T::KIND, record_id, err);
                        errors.push(SyncIssue::record(
                            T::KIND,
                            &record_id,
                            format!("push failed: {err}"),
                        ));
                    }
                }
            }
        }
        Err(err) => errors.push(SyncIssue::kind(
            T::KIND,
            format!("could not list pending rows: {err}"),
        )),
    }

    // Deletion phase: confirmed tombstones are purged, the rest retried.
    match ports.store.list_by_owner(owner, RecordFilter::Tombstoned).await {
        Ok(tombstones) => {
            for record in tombstones {
                let record_id = record.envelope().id.clone();
                match delete_record(ports, &record_id).await {
                    Ok(()) => counts.deleted += 1,
                    Err(err) => {
                        counts.failed += 1;
                        warn!(
                            "[Sync] remote delete failed for {} {}: {}",
                            T::KIND,
                            record_id,
                            err
                        );
                        errors.push(SyncIssue::record(
                            T::KIND,
                            &record_id,
                            format!("delete failed: {err}"),
                        ));
                    }
                }
            }
        }
        Err(err) => errors.push(SyncIssue::kind(
            T::KIND,
            format!("could not list tombstoned rows: {err}"),
        )),
    }

    // Pull phase: the remote collection is authoritative for every row
    // without a pending local edit.
    if let Err(err) = pull_kind(ports, owner, &mut counts).await {
        errors.push(SyncIssue::kind(T::KIND, format!("pull failed: {err}")));
    }

    counts
}

async fn push_record<T: Syncable>(
    ports: &KindPorts<T>,
    owner: &OwnerId,
    record: T,
) -> Result<()> {
    let current_id = record.envelope().id.clone();
    let fields = record.fields();

    if current_id.is_temporary() {
        let row = ports.remote.create(owner, &fields).await?;
        return adopt_remote_identity(ports, &current_id, record, row).await;
    }

    match ports.remote.update(current_id.as_str(), &fields).await {
        Ok(row) => {
            let mut confirmed = record;
            confirmed
                .envelope_mut()
                .confirm_synced(current_id, row.updated_at);
            ports.store.put(&confirmed).await
        }
        // The server deleted the row behind our back; the pending edit
        // restates its existence under a fresh authoritative id.
        Err(Error::Remote(RemoteError::NotFound)) => {
            debug!(
                "[Sync] update target {} {} missing remotely, recreating",
                T::KIND,
                current_id
            );
            let row = ports.remote.create(owner, &fields).await?;
            adopt_remote_identity(ports, &current_id, record, row).await
        }
        Err(err) => Err(err),
    }
}

/// Swap the local row onto the id the remote store just assigned. The
/// delete-and-insert runs in one store transaction so a temporary and an
/// authoritative row for the same logical record never coexist.
async fn adopt_remote_identity<T: Syncable>(
    ports: &KindPorts<T>,
    old_id: &RecordId,
    record: T,
    row: RemoteRow<T::Fields>,
) -> Result<()> {
    let mut confirmed = record;
    confirmed
        .envelope_mut()
        .confirm_synced(RecordId::Authoritative(row.id), row.updated_at);
    ports.store.replace(old_id, &confirmed).await
}

async fn delete_record<T: Syncable>(ports: &KindPorts<T>, id: &RecordId) -> Result<()> {
    if id.is_temporary() {
        // Never left the device; purge with no remote call.
        return ports.store.delete(id).await;
    }
    match ports.remote.delete(id.as_str()).await {
        Ok(()) => ports.store.delete(id).await,
        // Already gone remotely; the deletion is confirmed either way.
        Err(Error::Remote(RemoteError::NotFound)) => ports.store.delete(id).await,
        Err(err) => Err(err),
    }
}

async fn pull_kind<T: Syncable>(
    ports: &KindPorts<T>,
    owner: &OwnerId,
    counts: &mut KindCounts,
) -> Result<()> {
    let remote_rows = ports.remote.list_all(owner).await?;
    let remote_ids: HashSet<&str> = remote_rows.iter().map(|row| row.id.as_str()).collect();

    let local_rows = ports.store.list_by_owner(owner, RecordFilter::All).await?;
    let mut local_by_id: HashMap<String, T> = HashMap::with_capacity(local_rows.len());
    for record in local_rows {
        let env = record.envelope();
        if env.sync_status == SyncStatus::Synced
            && !env.id.is_temporary()
            && !remote_ids.contains(env.id.as_str())
        {
            ports.store.delete(&env.id).await?;
            counts.purged += 1;
            continue;
        }
        let key = env.id.as_str().to_string();
        local_by_id.insert(key, record);
    }

    for row in remote_rows {
        match local_by_id.remove(&row.id) {
            Some(existing) => match existing.envelope().sync_status {
                // Local wins until the pending edit is pushed. Conflict rows
                // are never overwritten automatically either.
                SyncStatus::Pending | SyncStatus::Conflict => {
                    debug!(
                        "[Sync] keeping local {} {} over remote payload",
                        T::KIND,
                        row.id
                    );
                }
                SyncStatus::Synced => {
                    let mut envelope = existing.envelope().clone();
                    envelope.absorb_remote(row.updated_at);
                    ports.store.put(&T::from_parts(envelope, row.fields)).await?;
                    counts.pulled += 1;
                }
            },
            None => {
                let envelope = SyncEnvelope::from_remote(
                    RecordId::from(row.id),
                    row.owner_id,
                    row.updated_at,
                );
                ports.store.put(&T::from_parts(envelope, row.fields)).await?;
                counts.pulled += 1;
            }
        }
    }

    Ok(())
}
