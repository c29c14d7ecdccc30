//! Sync engine, realtime merge handler and the ports they run against.

mod engine;
pub mod ports;
mod realtime;

pub use engine::{EnginePorts, KindCounts, KindPorts, SyncEngine, SyncIssue, SyncReport};
pub use ports::{
    ConnectivityProbe, RecordFilter, RecordStore, RemoteCollection, RemoteRow, Session,
    SessionProvider, SyncStateStore,
};
pub use realtime::{ChangeEvent, ChangeOp, MergeOutcome, RealtimeMergeHandler};
