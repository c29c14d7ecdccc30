//! Port traits at the boundaries of the sync core.
//!
//! The storage crate implements [`RecordStore`] and [`SyncStateStore`]; the
//! connect crate implements [`RemoteCollection`], [`ConnectivityProbe`] and
//! [`SessionProvider`]. Tests substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ids::RecordId;
use crate::records::{OwnerId, Syncable};

/// Row-set selector for [`RecordStore::list_by_owner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFilter {
    /// Every row, tombstoned included.
    All,
    /// Rows that are not tombstoned.
    Live,
    /// Pending rows that are not tombstoned — the push-phase work list.
    PendingLive,
    /// Tombstoned rows — the deletion-phase work list.
    Tombstoned,
}

/// Durable, per-owner partitioned storage for one entity kind.
///
/// Absence is never an error: `get` returns `None` and `delete` is a no-op
/// for unknown ids. Writes are atomic per record.
#[async_trait]
pub trait RecordStore<T: Syncable>: Send + Sync {
    async fn get(&self, id: &RecordId) -> Result<Option<T>>;

    /// Full-row upsert.
    async fn put(&self, record: &T) -> Result<()>;

    /// Delete `old_id` and insert `record` in a single transaction. Used to
    /// swap a temporary id for the authoritative one so both never coexist.
    async fn replace(&self, old_id: &RecordId, record: &T) -> Result<()>;

    async fn delete(&self, id: &RecordId) -> Result<()>;

    async fn list_by_owner(&self, owner: &OwnerId, filter: RecordFilter) -> Result<Vec<T>>;
}

/// A record as the remote store reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRow<F> {
    pub id: String,
    pub owner_id: OwnerId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: F,
}

/// Remote CRUD interface for one entity kind. Owner enforcement happens
/// server-side; the core does not re-validate it.
#[async_trait]
pub trait RemoteCollection<T: Syncable>: Send + Sync {
    async fn create(&self, owner: &OwnerId, fields: &T::Fields) -> Result<RemoteRow<T::Fields>>;

    /// Full field replace keyed by an authoritative id.
    async fn update(&self, id: &str, fields: &T::Fields) -> Result<RemoteRow<T::Fields>>;

    async fn delete(&self, id: &str) -> Result<()>;

    async fn list_all(&self, owner: &OwnerId) -> Result<Vec<RemoteRow<T::Fields>>>;
}

/// Sync metadata: the completion timestamp of the last pass per owner.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    async fn last_completed_pass(&self, owner: &OwnerId) -> Result<Option<DateTime<Utc>>>;

    async fn record_completed_pass(&self, owner: &OwnerId, at: DateTime<Utc>) -> Result<()>;
}

/// Network reachability as reported by the embedding application.
pub trait ConnectivityProbe: Send + Sync {
    fn is_online(&self) -> bool;
}

/// The signed-in user, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub owner_id: OwnerId,
}

pub trait SessionProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;
}
