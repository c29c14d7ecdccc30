//! Observable query layer.
//!
//! Every committed write publishes a [`ChangeNotice`] on the [`ChangeBus`].
//! [`Live`] handles hand consumers an immediate snapshot and a recomputed
//! one whenever a notice for the same kind and owner lands, whether the
//! write came from a local edit, a sync pass or the realtime feed.

use log::{debug, warn};
use tokio::sync::{broadcast, watch};

use moneta_core::errors::Result;
use moneta_core::records::{EntityKind, OwnerId};

const BUS_CAPACITY: usize = 256;

/// A write happened that may affect queries over `(kind, owner_id)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub kind: EntityKind,
    pub owner_id: OwnerId,
}

/// Broadcast channel for store writes.
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeNotice>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    pub fn publish(&self, kind: EntityKind, owner_id: &OwnerId) {
        // No subscribers is the normal cold-start state.
        let _ = self.tx.send(ChangeNotice {
            kind,
            owner_id: owner_id.clone(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeNotice> {
        self.tx.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A reactive query result: an initial snapshot immediately, then an
/// updated snapshot whenever an underlying write could affect it.
pub struct Live<T> {
    rx: watch::Receiver<Vec<T>>,
}

impl<T: Clone> Live<T> {
    pub fn snapshot(&self) -> Vec<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `false` once the refresher task
    /// has stopped (bus closed).
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}

/// Spawn a refresher task that re-runs `load` on every matching notice.
pub(crate) fn spawn_live_query<T, F>(
    bus: &ChangeBus,
    kind: EntityKind,
    owner_id: OwnerId,
    load: F,
) -> Live<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> Result<Vec<T>> + Send + 'static,
{
    let initial = match load() {
        Ok(rows) => rows,
        Err(err) => {
            warn!("[Store] live query initial load failed: {}", err);
            Vec::new()
        }
    };
    let (tx, rx) = watch::channel(initial);
    let mut notices = bus.subscribe();

    tokio::spawn(async move {
        loop {
            match notices.recv().await {
                Ok(notice) => {
                    if notice.kind != kind || notice.owner_id != owner_id {
                        continue;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!("[Store] live query lagged by {} notices, refreshing", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
            match load() {
                Ok(rows) => {
                    if tx.send(rows).is_err() {
                        break;
                    }
                }
                Err(err) => warn!("[Store] live query refresh failed: {}", err),
            }
        }
    });

    Live { rx }
}
