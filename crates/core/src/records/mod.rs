//! Domain records and the sync envelope they share.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::ids::RecordId;

mod debt;
mod goal;
mod transaction;

pub use debt::{Debt, DebtFields};
pub use goal::{InvestmentGoal, InvestmentGoalFields};
pub use transaction::{Transaction, TransactionDirection, TransactionFields};

/// Owning user of a record. Every row belongs to exactly one owner and all
/// queries and sync operations are scoped by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for OwnerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity kinds that participate in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Transaction,
    Debt,
    InvestmentGoal,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Transaction => "transaction",
            Self::Debt => "debt",
            Self::InvestmentGoal => "investment_goal",
        };
        f.write_str(name)
    }
}

/// Reconciliation state of the local copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Local copy is known equal to the remote copy as of `server_updated_at`.
    Synced,
    /// Local content has diverged from what was last confirmed and must be
    /// pushed.
    Pending,
    /// Reserved for rows the merge logic could not safely reconcile. Nothing
    /// assigns it automatically; such rows are left alone by every phase.
    Conflict,
}

/// Sync bookkeeping carried by every record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncEnvelope {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub sync_status: SyncStatus,
    /// Client-clock provenance of the last local mutation. Never used as a
    /// conflict-resolution key.
    pub local_updated_at: DateTime<Utc>,
    /// Server-clock timestamp of the last confirmed remote state.
    pub server_updated_at: Option<DateTime<Utc>>,
    /// Tombstone flag. The row is retained until the remote deletion is
    /// confirmed, or purged immediately if it never left the device.
    pub is_deleted: bool,
    /// Monotonic counter, incremented on every local mutation.
    pub version: i64,
}

impl SyncEnvelope {
    /// Envelope for a record created on this device: temporary id, pending.
    pub fn new_local(owner_id: OwnerId) -> Self {
        Self {
            id: RecordId::new_temporary(),
            owner_id,
            sync_status: SyncStatus::Pending,
            local_updated_at: Utc::now(),
            server_updated_at: None,
            is_deleted: false,
            version: 1,
        }
    }

    /// Envelope for a row first seen through pull or the realtime feed.
    pub fn from_remote(
        id: RecordId,
        owner_id: OwnerId,
        server_updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            sync_status: SyncStatus::Synced,
            local_updated_at: Utc::now(),
            server_updated_at: Some(server_updated_at),
            is_deleted: false,
            version: 1,
        }
    }

    /// Record a local edit: bumps the version and flips back to pending.
    pub fn mark_edited(&mut self) {
        self.version += 1;
        self.sync_status = SyncStatus::Pending;
        self.local_updated_at = Utc::now();
    }

    /// Tombstone the row. Deletion still has to be confirmed remotely.
    pub fn mark_deleted(&mut self) {
        self.is_deleted = true;
        self.mark_edited();
    }

    /// A push succeeded: adopt the (possibly new) authoritative id and the
    /// server timestamp. The version is untouched; nothing local changed.
    pub fn confirm_synced(&mut self, id: RecordId, server_updated_at: DateTime<Utc>) {
        self.id = id;
        self.sync_status = SyncStatus::Synced;
        self.server_updated_at = Some(server_updated_at);
    }

    /// Refresh from a remote row during pull or realtime merge. Only valid
    /// for rows without a pending local edit; `local_updated_at` is kept as
    /// provenance, not merged.
    pub fn absorb_remote(&mut self, server_updated_at: DateTime<Utc>) {
        self.version += 1;
        self.sync_status = SyncStatus::Synced;
        self.server_updated_at = Some(server_updated_at);
        self.is_deleted = false;
    }
}

/// A record kind that participates in offline-first sync.
///
/// Ties the concrete shape to its business-field payload, its kind
/// discriminant, and the natural key used by realtime duplicate
/// suppression.
pub trait Syncable: Clone + Send + Sync + 'static {
    /// Business fields, excluding the sync envelope. This is the payload
    /// exchanged with the remote store.
    type Fields: Clone
        + std::fmt::Debug
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    const KIND: EntityKind;

    fn envelope(&self) -> &SyncEnvelope;
    fn envelope_mut(&mut self) -> &mut SyncEnvelope;
    fn fields(&self) -> Self::Fields;
    fn from_parts(envelope: SyncEnvelope, fields: Self::Fields) -> Self;

    /// Natural key for duplicate suppression.
    ///
    /// Best-effort field matching, not a guarantee: two independently
    /// created, coincidentally identical records collapse to the same key.
    /// Kept behind this single function so a stronger mechanism (e.g. a
    /// client-generated idempotency key echoed by the server) can replace
    /// it without touching the merge logic.
    fn natural_key(fields: &Self::Fields) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope() -> SyncEnvelope {
        SyncEnvelope::new_local(OwnerId::from("user_1"))
    }

    #[test]
    fn new_local_is_pending_with_temporary_id() {
        let env = envelope();
        assert!(env.id.is_temporary());
        assert_eq!(env.sync_status, SyncStatus::Pending);
        assert_eq!(env.version, 1);
        assert!(!env.is_deleted);
        assert!(env.server_updated_at.is_none());
    }

    #[test]
    fn edits_bump_version_and_reopen_pending() {
        let mut env = envelope();
        env.confirm_synced(RecordId::from("tx_001"), Utc::now());
        assert_eq!(env.sync_status, SyncStatus::Synced);
        assert_eq!(env.version, 1);

        env.mark_edited();
        assert_eq!(env.sync_status, SyncStatus::Pending);
        assert_eq!(env.version, 2);
    }

    #[test]
    fn confirm_synced_adopts_authoritative_id() {
        let mut env = envelope();
        let when = Utc::now();
        env.confirm_synced(RecordId::from("tx_001"), when);
        assert!(!env.id.is_temporary());
        assert_eq!(env.server_updated_at, Some(when));
    }

    #[test]
    fn mark_deleted_tombstones_and_stays_pending() {
        let mut env = envelope();
        env.mark_deleted();
        assert!(env.is_deleted);
        assert_eq!(env.sync_status, SyncStatus::Pending);
        assert_eq!(env.version, 2);
    }

    #[test]
    fn absorb_remote_preserves_local_provenance() {
        let mut env = envelope();
        env.confirm_synced(RecordId::from("tx_001"), Utc::now());
        let provenance = env.local_updated_at;

        let when = Utc::now();
        env.absorb_remote(when);
        assert_eq!(env.sync_status, SyncStatus::Synced);
        assert_eq!(env.local_updated_at, provenance);
        assert_eq!(env.server_updated_at, Some(when));
        assert_eq!(env.version, 2);
    }

    #[test]
    fn wire_names_match_backend_contract() {
        assert_eq!(
            serde_json::to_string(&EntityKind::InvestmentGoal).unwrap(),
            "\"investment_goal\""
        );
        assert_eq!(
            serde_json::to_string(&SyncStatus::Pending).unwrap(),
            "\"pending\""
        );
    }
}
